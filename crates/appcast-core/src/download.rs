use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use appcast_model::{ManifestItem, ValidationResult};

use crate::signature::SignatureVerifier;

const FALLBACK_FILE_NAME: &str = "update-download";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateProgress {
    Downloading { downloaded: u64, total: u64 },
    Verifying,
    Complete(ValidationResult),
    Failed(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("update {version} has no download link")]
    MissingDownloadLink { version: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("download failed with HTTP {status}")]
    Status { status: reqwest::StatusCode },
    #[error("download cancelled")]
    Cancelled,
    #[error("downloaded update {} failed signature verification and was deleted", path.display())]
    SignatureInvalid { path: PathBuf },
}

impl DownloadError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}

/// A downloaded artifact that passed the signature gate.
#[derive(Debug, Clone)]
pub struct DownloadedUpdate {
    pub path: PathBuf,
    /// `Unchecked` means policy let the file through without authentication.
    pub validation: ValidationResult,
}

/// Download `item`'s artifact into `dest_dir` and check its signature.
///
/// Progress is reported on `progress`; a closed receiver is ignored. The file
/// is removed again if the download is interrupted or the signature gate
/// reports `Invalid`.
///
/// # Errors
/// Returns an error when the item has no link, the download fails or is
/// cancelled, the file cannot be written, or the signature is invalid.
pub async fn download_update(
    client: &reqwest::Client,
    item: &ManifestItem,
    verifier: &dyn SignatureVerifier,
    dest_dir: &Path,
    progress: &mpsc::Sender<UpdateProgress>,
    cancel: &CancellationToken,
) -> Result<DownloadedUpdate, DownloadError> {
    if !item.has_download_link() {
        return Err(DownloadError::MissingDownloadLink {
            version: item.version.to_string(),
        });
    }

    tokio::fs::create_dir_all(dest_dir).await.map_err(|error| {
        DownloadError::io_with_path("failed to create download directory", dest_dir, &error)
    })?;
    let file_name = item.download_file_name().unwrap_or(FALLBACK_FILE_NAME);
    let path = dest_dir.join(file_name);

    info!("Downloading update {} from {}", item.version, item.download_link);
    let url = item.download_link.trim();
    if let Err(error) = stream_to_file(client, url, &path, progress, cancel).await {
        let _ = progress.send(UpdateProgress::Failed(error.to_string())).await;
        return Err(error);
    }

    let _ = progress.send(UpdateProgress::Verifying).await;
    let payload = tokio::fs::read(&path).await.map_err(|error| {
        DownloadError::io_with_path("failed to read downloaded update", &path, &error)
    })?;
    let validation = verifier.verify(Some(&item.download_signature), &payload, true);

    if !validation.is_acceptable() {
        warn!(
            "Signature check failed for {}, deleting {}",
            item.version,
            path.display()
        );
        remove_partial(&path).await;
        let error = DownloadError::SignatureInvalid { path };
        let _ = progress.send(UpdateProgress::Failed(error.to_string())).await;
        return Err(error);
    }

    if !validation.is_authenticated() {
        warn!(
            "Update {} accepted without signature verification",
            item.version
        );
    }
    let _ = progress.send(UpdateProgress::Complete(validation)).await;
    Ok(DownloadedUpdate { path, validation })
}

/// Stream `url` into `dest`. Any failure, cancellation included, removes
/// whatever was written so far.
async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: &mpsc::Sender<UpdateProgress>,
    cancel: &CancellationToken,
) -> Result<(), DownloadError> {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(DownloadError::Cancelled),
        response = client.get(url).send() => {
            response.map_err(|error| DownloadError::http("download request failed", error))?
        }
    };
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status { status });
    }

    let total = response.content_length().unwrap_or(0);
    let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
        DownloadError::io_with_path("failed to create download file", dest, &error)
    })?;

    let written = copy_chunks(response, &mut file, dest, total, progress, cancel).await;
    drop(file);
    match written {
        Ok(bytes) => {
            info!("Download complete: {bytes} bytes");
            Ok(())
        }
        Err(error) => {
            remove_partial(dest).await;
            Err(error)
        }
    }
}

async fn copy_chunks(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    dest: &Path,
    total: u64,
    progress: &mpsc::Sender<UpdateProgress>,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|error| DownloadError::http("download stream error", error))?;

        file.write_all(&chunk).await.map_err(|error| {
            DownloadError::io_with_path("failed to write download data", dest, &error)
        })?;
        downloaded += chunk.len() as u64;
        // A receiver that went away only loses progress reports.
        let _ = progress
            .send(UpdateProgress::Downloading { downloaded, total })
            .await;
    }

    file.flush().await.map_err(|error| {
        DownloadError::io_with_path("failed to flush download file", dest, &error)
    })?;
    Ok(downloaded)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => warn!("Failed to remove {}: {error}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use appcast_model::{ManifestItem, SecurityMode, ValidationResult};
    use mockito::{Matcher, Server};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::{DownloadError, UpdateProgress, download_update};
    use crate::keys::KeyPair;
    use crate::signature::Ed25519Verifier;

    const ARTIFACT: &[u8] = b"pretend this is an installer";

    fn item(url: String, signature: String) -> ManifestItem {
        ManifestItem {
            download_signature: signature,
            ..ManifestItem::new("2.0.0", &url)
        }
    }

    async fn serve_artifact(server: &mut Server) -> mockito::Mock {
        server
            .mock("GET", "/downloads/app-2.0.0.msi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(ARTIFACT)
            .create_async()
            .await
    }

    fn drain(rx: &mut mpsc::Receiver<UpdateProgress>) -> Vec<UpdateProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn signed_download_is_kept_and_valid() {
        let mut server = Server::new_async().await;
        let _artifact = serve_artifact(&mut server).await;
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let pair = KeyPair::generate();
        let verifier = Ed25519Verifier::new(SecurityMode::Strict, Some(pair.verifying_key()));
        let (tx, mut rx) = mpsc::channel(256);

        let item = item(
            format!("{}/downloads/app-2.0.0.msi?token=abc", server.url()),
            pair.sign_bytes(ARTIFACT),
        );
        let downloaded = download_update(
            &reqwest::Client::new(),
            &item,
            &verifier,
            dir.path(),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .expect("download should succeed");

        assert_eq!(downloaded.validation, ValidationResult::Valid);
        assert_eq!(downloaded.path, dir.path().join("app-2.0.0.msi"));
        assert_eq!(
            std::fs::read(&downloaded.path).expect("artifact should exist"),
            ARTIFACT
        );

        let events = drain(&mut rx);
        assert!(events.iter().any(|event| matches!(
            event,
            UpdateProgress::Downloading { downloaded, .. } if *downloaded == ARTIFACT.len() as u64
        )));
        assert_eq!(
            events.last(),
            Some(&UpdateProgress::Complete(ValidationResult::Valid))
        );
    }

    #[tokio::test]
    async fn invalid_signature_deletes_download() {
        let mut server = Server::new_async().await;
        let _artifact = serve_artifact(&mut server).await;
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let pair = KeyPair::generate();
        let verifier = Ed25519Verifier::new(SecurityMode::Strict, Some(pair.verifying_key()));
        let (tx, mut rx) = mpsc::channel(256);

        let item = item(
            format!("{}/downloads/app-2.0.0.msi", server.url()),
            pair.sign_bytes(b"something else entirely"),
        );
        let result = download_update(
            &reqwest::Client::new(),
            &item,
            &verifier,
            dir.path(),
            &tx,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DownloadError::SignatureInvalid { .. })));
        assert!(!dir.path().join("app-2.0.0.msi").exists());
        assert!(matches!(
            drain(&mut rx).last(),
            Some(UpdateProgress::Failed(_))
        ));
    }

    #[tokio::test]
    async fn unsigned_download_is_unchecked_when_policy_allows() {
        let mut server = Server::new_async().await;
        let _artifact = serve_artifact(&mut server).await;
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let verifier = Ed25519Verifier::new(SecurityMode::Unsafe, None);
        let (tx, _rx) = mpsc::channel(256);

        let item = item(
            format!("{}/downloads/app-2.0.0.msi", server.url()),
            String::new(),
        );
        let downloaded = download_update(
            &reqwest::Client::new(),
            &item,
            &verifier,
            dir.path(),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .expect("download should succeed");

        assert_eq!(downloaded.validation, ValidationResult::Unchecked);
        assert!(downloaded.path.exists());
    }

    #[tokio::test]
    async fn http_errors_leave_nothing_behind() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/downloads/app-2.0.0.msi")
            .with_status(404)
            .create_async()
            .await;
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let verifier = Ed25519Verifier::new(SecurityMode::Unsafe, None);
        let (tx, _rx) = mpsc::channel(256);

        let item = item(
            format!("{}/downloads/app-2.0.0.msi", server.url()),
            String::new(),
        );
        let result = download_update(
            &reqwest::Client::new(),
            &item,
            &verifier,
            dir.path(),
            &tx,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DownloadError::Status { .. })));
        assert!(!dir.path().join("app-2.0.0.msi").exists());
    }

    #[tokio::test]
    async fn missing_link_and_cancellation_are_errors() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let verifier = Ed25519Verifier::new(SecurityMode::Unsafe, None);
        let (tx, _rx) = mpsc::channel(256);
        let client = reqwest::Client::new();

        let no_link = ManifestItem::new("2.0.0", "");
        assert!(matches!(
            download_update(
                &client,
                &no_link,
                &verifier,
                dir.path(),
                &tx,
                &CancellationToken::new()
            )
            .await,
            Err(DownloadError::MissingDownloadLink { .. })
        ));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let item = ManifestItem::new("2.0.0", "http://127.0.0.1:9/app.msi");
        assert!(matches!(
            download_update(&client, &item, &verifier, dir.path(), &tx, &cancel).await,
            Err(DownloadError::Cancelled)
        ));
    }
}
