use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use appcast_core::codec::ManifestFormat;
use appcast_core::{
    ChannelFilter, DEFAULT_SIGNATURE_EXTENSION, FilterOptions, PublicKeySource, UpdaterConfig,
};
use appcast_model::{InstalledState, SecurityMode};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no manifest URL configured; pass --url or set manifest_url in {}", path.display())]
    MissingManifestUrl { path: PathBuf },
}

impl SettingsError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    #[serde(default)]
    pub manifest_url: String,

    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Base64 public key. Takes precedence over `public_key_file`.
    #[serde(default)]
    pub public_key: Option<String>,

    #[serde(default)]
    pub public_key_file: Option<PathBuf>,

    #[serde(default = "default_signature_extension")]
    pub signature_extension: String,

    #[serde(default)]
    pub manifest_format: ManifestFormat,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_installed_version")]
    pub installed_version: String,

    #[serde(default)]
    pub last_skipped_version: Option<String>,

    /// Release channels to follow, for example `["beta"]`. Empty means only
    /// regular releases.
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default = "default_true")]
    pub keep_items_with_no_suffix: bool,

    #[serde(default)]
    pub remove_items_without_version: bool,

    #[serde(default)]
    pub remove_items_without_download_link: bool,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_signature_extension() -> String {
    DEFAULT_SIGNATURE_EXTENSION.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_installed_version() -> String {
    "0.0.0".to_string()
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            manifest_url: String::new(),
            security_mode: SecurityMode::default(),
            public_key: None,
            public_key_file: None,
            signature_extension: default_signature_extension(),
            manifest_format: ManifestFormat::default(),
            http_timeout_secs: default_http_timeout(),
            installed_version: default_installed_version(),
            last_skipped_version: None,
            channels: Vec::new(),
            keep_items_with_no_suffix: true,
            remove_items_without_version: false,
            remove_items_without_download_link: false,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl UpdaterSettings {
    /// Read settings from `path`. A missing or unreadable file yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                log::warn!("Ignoring invalid settings in {}: {error}", path.display());
                Self::default()
            }),
            Err(error) => {
                log::warn!("Failed to read settings {}: {error}", path.display());
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| SettingsError::io("failed to create", parent, error))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        std::fs::write(path, content)
            .map_err(|error| SettingsError::io("failed to write", path, error))
    }

    #[must_use]
    pub fn public_key_source(&self) -> Option<PublicKeySource> {
        let inline = self
            .public_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        match (inline, &self.public_key_file) {
            (Some(key), _) => Some(PublicKeySource::Inline(key.to_string())),
            (None, Some(path)) => Some(PublicKeySource::File(path.clone())),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn installed_state(&self) -> InstalledState {
        InstalledState::new(&self.installed_version)
            .with_skipped(self.last_skipped_version.as_deref().unwrap_or_default())
    }

    /// Translate the file into engine configuration. `settings_path` is only
    /// used for error messages.
    pub fn updater_config(&self, settings_path: &Path) -> Result<UpdaterConfig, SettingsError> {
        let manifest_url = self.manifest_url.trim();
        if manifest_url.is_empty() {
            return Err(SettingsError::MissingManifestUrl {
                path: settings_path.to_path_buf(),
            });
        }

        let channel_filter = (!self.channels.is_empty()).then(|| {
            ChannelFilter::new(&self.channels)
                .keep_items_with_no_suffix(self.keep_items_with_no_suffix)
        });

        Ok(UpdaterConfig {
            manifest_url: manifest_url.to_string(),
            security_mode: self.security_mode,
            public_key: self.public_key_source(),
            signature_extension: self.signature_extension.clone(),
            format: self.manifest_format,
            http_timeout: Duration::from_secs(self.http_timeout_secs.max(1)),
            filter: FilterOptions {
                remove_items_without_version: self.remove_items_without_version,
                remove_items_without_download_link: self.remove_items_without_download_link,
                ..FilterOptions::default()
            },
            channel_filter,
        })
    }
}
