use std::path::PathBuf;
use thiserror::Error;

const APP_DIR_NAME: &str = "appcast";

/// Environment variable that roots every directory under one folder.
pub const HOME_OVERRIDE_VAR: &str = "APPCAST_HOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("could not determine the user {kind} directory")]
pub struct AppPathsError {
    pub kind: &'static str,
}

/// Per-user locations for settings, downloaded artifacts and the log file.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the directories for the current user.
    ///
    /// `APPCAST_HOME`, when set and non-empty, wins over the platform
    /// locations.
    ///
    /// # Errors
    /// Returns an error when the platform base directory for config, cache or
    /// data cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let override_root = std::env::var_os(HOME_OVERRIDE_VAR).filter(|root| !root.is_empty());
        if let Some(root) = override_root {
            return Ok(Self::rooted_at(root));
        }

        Ok(Self {
            config_dir: platform_dir("config", dirs::config_dir)?,
            cache_dir: platform_dir("cache", dirs::cache_dir)?,
            data_dir: platform_dir("data", dirs::data_dir)?,
        })
    }

    /// Paths rooted under a single directory, used for portable installs and
    /// tests.
    #[must_use]
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            data_dir: root.join("data"),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Directory that downloaded update artifacts are written into.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join("downloads")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(format!("{APP_DIR_NAME}.log"))
    }

    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        [&self.config_dir, &self.cache_dir, &self.data_dir]
            .into_iter()
            .try_for_each(std::fs::create_dir_all)
    }
}

fn platform_dir(
    kind: &'static str,
    base: fn() -> Option<PathBuf>,
) -> Result<PathBuf, AppPathsError> {
    base()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(AppPathsError { kind })
}
