use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use appcast_model::ValidationResult;

use crate::signature::SignatureVerifier;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SIGNATURE_EXTENSION: &str = "signature";
/// Extension tried when the configured one yields nothing.
pub const LEGACY_SIGNATURE_EXTENSION: &str = "dsa";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} failed with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("download of {url} timed out")]
    Timeout { url: String },
    #[error("download cancelled")]
    Cancelled,
    #[error("manifest at {url} failed signature verification")]
    SignatureInvalid { url: String },
    #[error("manifest at {url} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        url: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl FetchError {
    pub(crate) fn request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Fetches raw bytes for a URL. The seam tests use to stand in for HTTP.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(user_agent())
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }
}

/// Client for update artifacts. There is no overall deadline since installers
/// can be large, but a connection that stays silent for `idle_timeout` fails.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised.
pub fn artifact_client(idle_timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(idle_timeout))
        .read_timeout(idle_timeout)
        .user_agent(user_agent())
        .build()
        .map_err(FetchError::ClientBuild)
}

fn user_agent() -> String {
    format!("appcast/{}", env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::request(url, error))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|error| FetchError::request(url, error))
    }
}

/// A manifest that passed the signature gate, with the gate's verdict.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub raw: String,
    pub validation: ValidationResult,
}

/// Downloads a manifest and its detached signature, refusing manifests whose
/// required signature does not verify.
pub struct ManifestFetcher {
    downloader: Arc<dyn Downloader>,
    verifier: Arc<dyn SignatureVerifier>,
    signature_extension: String,
}

impl ManifestFetcher {
    #[must_use]
    pub fn new(downloader: Arc<dyn Downloader>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            downloader,
            verifier,
            signature_extension: DEFAULT_SIGNATURE_EXTENSION.to_string(),
        }
    }

    /// Override the detached signature extension. Leading dots are ignored and
    /// a blank value restores the default.
    #[must_use]
    pub fn with_signature_extension(mut self, extension: &str) -> Self {
        let extension = extension.trim().trim_start_matches('.');
        self.signature_extension = if extension.is_empty() {
            DEFAULT_SIGNATURE_EXTENSION.to_string()
        } else {
            extension.to_string()
        };
        self
    }

    /// Download and authenticate the manifest at `url`.
    ///
    /// # Errors
    /// Returns an error if the manifest itself cannot be downloaded, the
    /// signature gate reports `Invalid`, the body is not UTF-8, or `cancel`
    /// fires first. Failing to fetch the signature file is not an error; it
    /// counts as an absent signature.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedManifest, FetchError> {
        info!("Fetching manifest from {url}");
        let bytes = cancellable(cancel, self.downloader.download(url)).await?;
        debug!("Manifest is {} bytes", bytes.len());

        let validation = if self.verifier.is_signature_needed(false) {
            let signature = self.download_signature(url, cancel).await?;
            self.verifier.verify(signature.as_deref(), &bytes, false)
        } else {
            ValidationResult::Unchecked
        };

        if !validation.is_acceptable() {
            warn!("Rejecting manifest from {url}: signature did not verify");
            return Err(FetchError::SignatureInvalid {
                url: url.to_string(),
            });
        }

        let mut raw = String::from_utf8(bytes).map_err(|source| FetchError::InvalidUtf8 {
            url: url.to_string(),
            source,
        })?;
        if raw.starts_with('\u{feff}') {
            raw.drain(..'\u{feff}'.len_utf8());
        }

        Ok(FetchedManifest { raw, validation })
    }

    async fn download_signature(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        let mut extensions = vec![self.signature_extension.as_str()];
        if !self
            .signature_extension
            .eq_ignore_ascii_case(LEGACY_SIGNATURE_EXTENSION)
        {
            extensions.push(LEGACY_SIGNATURE_EXTENSION);
        }

        for extension in extensions {
            let signature_url = format!("{url}.{extension}");
            match cancellable(cancel, self.downloader.download(&signature_url)).await {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).trim().to_string();
                    if !text.is_empty() {
                        debug!("Using manifest signature from {signature_url}");
                        return Ok(Some(text));
                    }
                }
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(error) => debug!("No signature at {signature_url}: {error}"),
            }
        }

        Ok(None)
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Cancelled),
        result = operation => result,
    }
}
