use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use appcast_core::codec::ManifestFormat;
use appcast_core::{
    UpdateCheckReport, UpdateChecker, UpdateProgress, artifact_client, download_update,
};
use appcast_model::{InstalledState, SecurityMode, UpdateStatus, ValidationResult};

use crate::commands::Context;
use crate::error::CliError;

/// Per-invocation overrides for the stored settings.
#[derive(Debug, Default)]
pub struct CheckOptions {
    pub url: Option<String>,
    pub installed: Option<String>,
    pub format: Option<ManifestFormat>,
    pub mode: Option<SecurityMode>,
    pub download: bool,
}

pub async fn run(ctx: &Context, options: CheckOptions) -> Result<UpdateStatus, CliError> {
    let mut settings = ctx.settings.clone();
    if let Some(url) = options.url {
        settings.manifest_url = url;
    }
    if let Some(installed) = options.installed {
        settings.installed_version = installed;
    }
    if let Some(format) = options.format {
        settings.manifest_format = format;
    }
    if let Some(mode) = options.mode {
        settings.security_mode = mode;
    }

    let config = settings.updater_config(&ctx.settings_path)?;
    let idle_timeout = config.http_timeout;
    let checker = UpdateChecker::new(config)?;
    let installed = settings.installed_state();
    let cancel = CancellationToken::new();

    let report = checker.try_check(&installed, &cancel).await?;
    print_report(&installed, &report);

    if options.download
        && report.status == UpdateStatus::UpdateAvailable
        && let Some(item) = report.latest()
    {
        let client = artifact_client(idle_timeout)?;

        let (tx, mut rx) = mpsc::channel(64);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_progress(&event);
            }
        });

        let result = download_update(
            &client,
            item,
            checker.verifier().as_ref(),
            &ctx.paths.downloads_dir(),
            &tx,
            &cancel,
        )
        .await;
        drop(tx);
        let _ = printer.await;

        let downloaded = result?;
        println!("Saved {}", downloaded.path.display());
    }

    Ok(report.status)
}

fn print_report(installed: &InstalledState, report: &UpdateCheckReport) {
    println!("Installed version:  {}", installed.installed_version);
    if let Some(validation) = report.manifest_validation {
        let label = match validation {
            ValidationResult::Valid => "valid",
            ValidationResult::Unchecked => "not authenticated",
            ValidationResult::Invalid => "invalid",
        };
        println!("Manifest signature: {label}");
    }
    println!("Status:             {}", report.status);

    if report.updates.is_empty() {
        return;
    }
    println!();
    println!("Candidates:");
    for item in &report.updates {
        let mut line = format!("  {}", item.version);
        if item.is_critical {
            line.push_str(" (critical)");
        }
        if !item.download_link.is_empty() {
            line.push_str("  ");
            line.push_str(&item.download_link);
        }
        println!("{line}");
    }
}

#[allow(clippy::cast_precision_loss)]
fn print_progress(event: &UpdateProgress) {
    match event {
        UpdateProgress::Downloading { downloaded, total } if *total > 0 => {
            let percent = *downloaded as f64 / *total as f64 * 100.0;
            eprint!("\rDownloading: {percent:5.1}% ({downloaded}/{total} bytes)");
        }
        UpdateProgress::Downloading { downloaded, .. } => {
            eprint!("\rDownloading: {downloaded} bytes");
        }
        UpdateProgress::Verifying => eprintln!("\nVerifying signature..."),
        UpdateProgress::Complete(validation) => eprintln!("Signature check: {validation}"),
        UpdateProgress::Failed(message) => eprintln!("\nDownload failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use appcast_platform::{AppPaths, OperatingSystem};
    use mockito::Server;

    use super::{CheckOptions, run};
    use crate::commands::Context;
    use crate::error::CliError;
    use crate::settings::{SettingsError, UpdaterSettings};
    use appcast_core::codec::ManifestFormat;
    use appcast_model::{SecurityMode, UpdateStatus};

    fn context(root: &std::path::Path) -> Context {
        let paths = AppPaths::rooted_at(root);
        Context {
            settings_path: paths.settings_file(),
            paths,
            settings: UpdaterSettings::default(),
        }
    }

    fn manifest(os: &str) -> String {
        format!(
            r#"{{"title": "Example", "items": [
                {{"version": "1.0.0", "url": "https://example.com/app-1.0.0", "os": "{os}"}},
                {{"version": "1.1.0", "url": "https://example.com/app-1.1.0", "os": "{os}"}}
            ]}}"#
        )
    }

    #[tokio::test]
    async fn overrides_drive_the_check() {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/appcast.json")
            .with_status(200)
            .with_body(manifest(OperatingSystem::current().tag()))
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let ctx = context(temp_dir.path());

        let options = CheckOptions {
            url: Some(format!("{}/appcast.json", server.url())),
            installed: Some("1.0.0".to_string()),
            format: Some(ManifestFormat::Json),
            mode: Some(SecurityMode::Unsafe),
            download: false,
        };
        let status = run(&ctx, options).await.expect("check should succeed");
        assert_eq!(status, UpdateStatus::UpdateAvailable);

        let options = CheckOptions {
            url: Some(format!("{}/appcast.json", server.url())),
            installed: Some("1.1.0".to_string()),
            format: Some(ManifestFormat::Json),
            mode: Some(SecurityMode::Unsafe),
            download: false,
        };
        let status = run(&ctx, options).await.expect("check should succeed");
        assert_eq!(status, UpdateStatus::UpdateNotAvailable);
    }

    #[tokio::test]
    async fn missing_url_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let ctx = context(temp_dir.path());

        let result = run(&ctx, CheckOptions::default()).await;
        assert!(matches!(
            result,
            Err(CliError::Settings(SettingsError::MissingManifestUrl { .. }))
        ));
    }

    #[tokio::test]
    async fn strict_mode_without_key_rejects_manifest() {
        let mut server = Server::new_async().await;
        let _manifest = server
            .mock("GET", "/appcast.json")
            .with_status(200)
            .with_body(manifest(OperatingSystem::current().tag()))
            .create_async()
            .await;
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let ctx = context(temp_dir.path());

        let options = CheckOptions {
            url: Some(format!("{}/appcast.json", server.url())),
            format: Some(ManifestFormat::Json),
            mode: Some(SecurityMode::Strict),
            ..CheckOptions::default()
        };
        assert!(matches!(
            run(&ctx, options).await,
            Err(CliError::Check(_))
        ));
    }
}
