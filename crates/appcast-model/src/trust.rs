use serde::{Deserialize, Serialize};
use std::fmt;

/// How strictly signatures are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Require signatures only when a public key is configured.
    UseIfPossible,
    /// Always require a valid signature; without a key nothing is trusted.
    #[default]
    Strict,
    /// Never require signatures. Signatures are still checked when both a
    /// key and a signature are available.
    Unsafe,
    /// Require signatures on downloaded artifacts but not on the manifest.
    OnlyVerifySoftwareDownloads,
}

impl SecurityMode {
    #[must_use]
    pub fn is_signature_needed(self, has_key_material: bool, is_software_download: bool) -> bool {
        match self {
            Self::UseIfPossible => has_key_material,
            Self::Strict => true,
            Self::Unsafe => false,
            Self::OnlyVerifySoftwareDownloads => is_software_download,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UseIfPossible => "use_if_possible",
            Self::Strict => "strict",
            Self::Unsafe => "unsafe",
            Self::OnlyVerifySoftwareDownloads => "only_verify_software_downloads",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking a signature.
///
/// `Unchecked` means the payload was accepted without authentication because
/// policy allowed it. It must never be reported as verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid,
    Unchecked,
}

impl ValidationResult {
    /// Whether processing may continue.
    #[must_use]
    pub fn is_acceptable(self) -> bool {
        matches!(self, Self::Valid | Self::Unchecked)
    }

    #[must_use]
    pub fn is_authenticated(self) -> bool {
        self == Self::Valid
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
            Self::Unchecked => write!(f, "unchecked"),
        }
    }
}

/// Signature configuration as seen by the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustPolicy {
    pub mode: SecurityMode,
    pub has_valid_key_material: bool,
}

impl TrustPolicy {
    #[must_use]
    pub fn new(mode: SecurityMode, has_valid_key_material: bool) -> Self {
        Self {
            mode,
            has_valid_key_material,
        }
    }

    #[must_use]
    pub fn is_signature_needed(self, is_software_download: bool) -> bool {
        self.mode
            .is_signature_needed(self.has_valid_key_material, is_software_download)
    }
}
