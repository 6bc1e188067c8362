//! Update-decision engine for appcast based auto-updaters.
//!
//! This crate holds the logic between "a manifest URL" and "a verified file
//! on disk", independent of any UI:
//! - Manifest codecs for the Sparkle RSS and JSON formats.
//! - The Ed25519 signature gate and key tooling.
//! - Manifest fetching with detached signatures.
//! - The candidate filter pipeline and channel filtering.
//! - Update status computation and verified artifact downloads.

pub mod codec;
mod download;
mod fetch;
mod filter;
mod keys;
mod signature;
mod update;

/// Verified artifact download with progress reporting.
pub use download::{DownloadError, DownloadedUpdate, UpdateProgress, download_update};
/// Manifest download seam, HTTP implementation, and signature lookup.
pub use fetch::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_SIGNATURE_EXTENSION, Downloader, FetchError, FetchedManifest,
    HttpDownloader, LEGACY_SIGNATURE_EXTENSION, ManifestFetcher, artifact_client,
};
/// Candidate filter pipeline and the stock channel filter.
pub use filter::{ChannelFilter, FilterOptions, filter_updates};
/// Ed25519 key material import, export, and signing.
pub use keys::{
    KeyError, KeyPair, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, PublicKeySource, decode_public_key,
    encode_public_key,
};
/// Signature verification seam and its Ed25519 implementation.
pub use signature::{Ed25519Verifier, SignatureVerifier};
/// Update checks and their configuration.
pub use update::{CheckError, UpdateCheckReport, UpdateChecker, UpdaterConfig};
