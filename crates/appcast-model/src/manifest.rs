use std::cmp::Ordering;

use appcast_platform::OperatingSystem;
use chrono::{DateTime, Utc};

use crate::version::VersionKey;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
/// Items without an OS tag predate multi-platform manifests and are Windows
/// builds.
pub const DEFAULT_OPERATING_SYSTEM: &str = OperatingSystem::Windows.tag();

/// One candidate update listed in a manifest.
///
/// Two items are equal, and ordered, purely by their [`VersionKey`]; titles and
/// links do not participate.
#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub title: String,
    pub version: VersionKey,
    pub short_version: String,
    pub release_notes_link: String,
    pub release_notes_signature: String,
    /// Release notes embedded in the manifest (HTML or Markdown).
    pub description: String,
    pub download_link: String,
    /// Base64 Ed25519 signature of the artifact behind `download_link`.
    pub download_signature: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub is_critical: bool,
    pub update_size: u64,
    pub operating_system: String,
    pub mime_type: String,
    /// Optional release track name (for example `beta`).
    pub channel: String,
}

impl Default for ManifestItem {
    fn default() -> Self {
        Self {
            title: String::new(),
            version: VersionKey::default(),
            short_version: String::new(),
            release_notes_link: String::new(),
            release_notes_signature: String::new(),
            description: String::new(),
            download_link: String::new(),
            download_signature: String::new(),
            publication_date: None,
            is_critical: false,
            update_size: 0,
            operating_system: DEFAULT_OPERATING_SYSTEM.to_string(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            channel: String::new(),
        }
    }
}

impl ManifestItem {
    #[must_use]
    pub fn new(version: &str, download_link: &str) -> Self {
        Self {
            version: VersionKey::parse(version),
            download_link: download_link.to_string(),
            ..Self::default()
        }
    }

    /// An empty OS tag is treated as Windows for compatibility with manifests
    /// that predate the `os` attribute; macOS and Linux require an explicit
    /// tag.
    #[must_use]
    pub fn is_windows_update(&self) -> bool {
        self.operating_system.trim().is_empty()
            || OperatingSystem::Windows.matches_tag(&self.operating_system)
    }

    #[must_use]
    pub fn is_mac_update(&self) -> bool {
        OperatingSystem::MacOs.matches_tag(&self.operating_system)
    }

    #[must_use]
    pub fn is_linux_update(&self) -> bool {
        OperatingSystem::Linux.matches_tag(&self.operating_system)
    }

    #[must_use]
    pub fn targets(&self, os: OperatingSystem) -> bool {
        match os {
            OperatingSystem::Windows => self.is_windows_update(),
            OperatingSystem::MacOs => self.is_mac_update(),
            OperatingSystem::Linux => self.is_linux_update(),
        }
    }

    #[must_use]
    pub fn has_version(&self) -> bool {
        !self.version.is_empty()
    }

    #[must_use]
    pub fn has_download_link(&self) -> bool {
        !self.download_link.trim().is_empty()
    }

    #[must_use]
    pub fn has_download_signature(&self) -> bool {
        !self.download_signature.trim().is_empty()
    }

    /// File name of the artifact behind `download_link`, if it has one.
    #[must_use]
    pub fn download_file_name(&self) -> Option<&str> {
        let path = self.download_link.split(['?', '#']).next()?;
        path.rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && !name.contains(".."))
    }
}

impl PartialEq for ManifestItem {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for ManifestItem {}

impl Ord for ManifestItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl PartialOrd for ManifestItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A downloaded appcast: channel metadata plus candidate updates.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub title: String,
    pub language: String,
    pub link: String,
    pub description: String,
    pub items: Vec<ManifestItem>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            title: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            link: String::new(),
            description: String::new(),
            items: Vec::new(),
        }
    }
}

impl Manifest {
    /// Sort items newest first. The sort is stable, so items sharing a version
    /// keep their document order.
    pub fn sort_newest_first(&mut self) {
        self.items.sort_by(|a, b| b.version.cmp(&a.version));
    }

    /// Newest item by version, independent of the current item order.
    #[must_use]
    pub fn latest(&self) -> Option<&ManifestItem> {
        latest_item(&self.items)
    }
}

/// Newest item by version. Ties resolve to the earliest item in the slice.
#[must_use]
pub fn latest_item(items: &[ManifestItem]) -> Option<&ManifestItem> {
    items.iter().reduce(|best, item| {
        if item.version > best.version {
            item
        } else {
            best
        }
    })
}
