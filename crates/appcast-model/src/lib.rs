//! Data model shared by the appcast crates.
//!
//! - [`VersionKey`]: lenient, totally ordered version strings.
//! - [`Manifest`] / [`ManifestItem`]: a parsed appcast and its candidates.
//! - Trust policy types consumed by the signature gate and filter pipeline.
//! - [`ManifestFilter`]: the seam for caller-defined candidate selection.

mod manifest;
mod status;
mod traits;
mod trust;
mod version;

pub use manifest::{
    DEFAULT_LANGUAGE, DEFAULT_MIME_TYPE, DEFAULT_OPERATING_SYSTEM, Manifest, ManifestItem,
    latest_item,
};
pub use status::{InstalledState, UpdateStatus};
pub use traits::ManifestFilter;
pub use trust::{SecurityMode, TrustPolicy, ValidationResult};
pub use version::VersionKey;

pub use appcast_platform::OperatingSystem;
