use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::VersionKey;

/// What the persistence layer knows about the running installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledState {
    pub installed_version: VersionKey,
    pub last_skipped_version: Option<VersionKey>,
}

impl InstalledState {
    #[must_use]
    pub fn new(installed_version: &str) -> Self {
        Self {
            installed_version: VersionKey::parse(installed_version),
            last_skipped_version: None,
        }
    }

    #[must_use]
    pub fn with_skipped(mut self, skipped: &str) -> Self {
        let skipped = skipped.trim();
        self.last_skipped_version = (!skipped.is_empty()).then(|| VersionKey::parse(skipped));
        self
    }
}

/// Result of an update check, as rendered by a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// The manifest could not be fetched, trusted, or parsed.
    CouldNotDetermine,
    UpdateNotAvailable,
    /// The newest candidate is the version the user chose to skip.
    UserSkipped,
    UpdateAvailable,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CouldNotDetermine => write!(f, "could not determine update status"),
            Self::UpdateNotAvailable => write!(f, "no update available"),
            Self::UserSkipped => write!(f, "update available but skipped"),
            Self::UpdateAvailable => write!(f, "update available"),
        }
    }
}
