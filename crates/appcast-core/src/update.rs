use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use appcast_model::{
    InstalledState, Manifest, ManifestFilter, ManifestItem, SecurityMode, UpdateStatus,
    ValidationResult, latest_item,
};

use crate::codec::{CodecError, ManifestCodec, ManifestFormat};
use crate::fetch::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_SIGNATURE_EXTENSION, Downloader, FetchError, HttpDownloader,
    ManifestFetcher,
};
use crate::filter::{ChannelFilter, FilterOptions, filter_updates};
use crate::keys::PublicKeySource;
use crate::signature::{Ed25519Verifier, SignatureVerifier};

/// Everything the update engine needs from its host application.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub manifest_url: String,
    pub security_mode: SecurityMode,
    pub public_key: Option<PublicKeySource>,
    pub signature_extension: String,
    pub format: ManifestFormat,
    pub http_timeout: Duration,
    pub filter: FilterOptions,
    /// Used as the custom filter stage when set.
    pub channel_filter: Option<ChannelFilter>,
}

impl UpdaterConfig {
    #[must_use]
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            security_mode: SecurityMode::default(),
            public_key: None,
            signature_extension: DEFAULT_SIGNATURE_EXTENSION.to_string(),
            format: ManifestFormat::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            filter: FilterOptions::default(),
            channel_filter: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Outcome of one update check.
#[derive(Debug, Clone)]
pub struct UpdateCheckReport {
    pub status: UpdateStatus,
    /// Candidates that survived filtering, in pipeline order.
    pub updates: Vec<ManifestItem>,
    /// Verdict on the manifest signature, when a manifest was fetched.
    pub manifest_validation: Option<ValidationResult>,
    pub manifest: Option<Manifest>,
}

impl UpdateCheckReport {
    fn could_not_determine() -> Self {
        Self {
            status: UpdateStatus::CouldNotDetermine,
            updates: Vec::new(),
            manifest_validation: None,
            manifest: None,
        }
    }

    /// Newest candidate by version, whatever order the filters left.
    #[must_use]
    pub fn latest(&self) -> Option<&ManifestItem> {
        latest_item(&self.updates)
    }
}

/// Runs fetch, decode, and filter for one manifest URL.
pub struct UpdateChecker {
    fetcher: ManifestFetcher,
    verifier: Arc<dyn SignatureVerifier>,
    codec: Box<dyn ManifestCodec>,
    manifest_url: String,
    options: FilterOptions,
    custom_filter: Option<Box<dyn ManifestFilter>>,
}

impl UpdateChecker {
    /// Build a checker that talks HTTP and verifies with Ed25519.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: UpdaterConfig) -> Result<Self, FetchError> {
        let downloader = HttpDownloader::new(config.http_timeout)?;
        let verifier =
            Ed25519Verifier::from_source(config.security_mode, config.public_key.as_ref());
        Ok(Self::with_parts(
            config,
            Arc::new(downloader),
            Arc::new(verifier),
        ))
    }

    #[must_use]
    pub fn with_parts(
        config: UpdaterConfig,
        downloader: Arc<dyn Downloader>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let fetcher = ManifestFetcher::new(downloader, Arc::clone(&verifier))
            .with_signature_extension(&config.signature_extension);
        Self {
            fetcher,
            verifier,
            codec: config.format.codec(false),
            manifest_url: config.manifest_url,
            options: config.filter,
            custom_filter: config
                .channel_filter
                .map(|filter| Box::new(filter) as Box<dyn ManifestFilter>),
        }
    }

    /// Replace the custom filter stage.
    #[must_use]
    pub fn with_custom_filter(mut self, filter: impl ManifestFilter + 'static) -> Self {
        self.custom_filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn verifier(&self) -> &Arc<dyn SignatureVerifier> {
        &self.verifier
    }

    /// Check for updates, folding every failure into
    /// [`UpdateStatus::CouldNotDetermine`].
    pub async fn check(
        &self,
        installed: &InstalledState,
        cancel: &CancellationToken,
    ) -> UpdateCheckReport {
        match self.try_check(installed, cancel).await {
            Ok(report) => report,
            Err(CheckError::Fetch(FetchError::Cancelled)) => {
                info!("Update check cancelled");
                UpdateCheckReport::could_not_determine()
            }
            Err(error) => {
                error!("Update check failed: {error}");
                UpdateCheckReport::could_not_determine()
            }
        }
    }

    /// Check for updates, surfacing the failure reason.
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be fetched, fails signature
    /// verification, or is not a readable document.
    pub async fn try_check(
        &self,
        installed: &InstalledState,
        cancel: &CancellationToken,
    ) -> Result<UpdateCheckReport, CheckError> {
        let fetched = self.fetcher.fetch(&self.manifest_url, cancel).await?;
        let manifest = self.codec.decode(&fetched.raw)?;
        debug!(
            "Decoded {} manifest with {} items (signature {})",
            self.codec.format(),
            manifest.items.len(),
            fetched.validation
        );

        let updates = filter_updates(
            manifest.items.clone(),
            &installed.installed_version,
            self.verifier.trust_policy(),
            &self.options,
            self.custom_filter.as_deref(),
        );
        let status = compute_status(installed, &updates);
        info!(
            "Update status for {}: {status} ({} candidates)",
            installed.installed_version,
            updates.len()
        );

        Ok(UpdateCheckReport {
            status,
            updates,
            manifest_validation: Some(fetched.validation),
            manifest: Some(manifest),
        })
    }
}

fn compute_status(installed: &InstalledState, updates: &[ManifestItem]) -> UpdateStatus {
    let Some(latest) = latest_item(updates) else {
        return UpdateStatus::UpdateNotAvailable;
    };

    if installed.last_skipped_version.as_ref() == Some(&latest.version) {
        UpdateStatus::UserSkipped
    } else {
        UpdateStatus::UpdateAvailable
    }
}
