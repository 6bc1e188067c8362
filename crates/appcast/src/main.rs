mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;

use appcast_platform::AppPaths;

use crate::cli::{Cli, Commands};
use crate::commands::check::CheckOptions;
use crate::commands::keys::VerifyArgs;
use crate::commands::{Context, check, convert, keys, skip};
use crate::error::CliError;
use crate::settings::UpdaterSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let paths = AppPaths::new()?;
    let settings_path = cli.settings.unwrap_or_else(|| paths.settings_file());
    let settings = UpdaterSettings::load_from(&settings_path);

    logging::init_logging(
        &paths.log_file(),
        cli.verbose || settings.debug_logging,
        settings.max_log_size_bytes,
    );
    log::info!(
        "appcast {} starting, settings at {}",
        env!("CARGO_PKG_VERSION"),
        settings_path.display()
    );

    let ctx = Context {
        paths,
        settings_path,
        settings,
    };

    match cli.command {
        Commands::Check {
            url,
            installed,
            format,
            mode,
            download,
        } => {
            let options = CheckOptions {
                url,
                installed,
                format: format.map(Into::into),
                mode: mode.map(Into::into),
                download,
            };
            check::run(&ctx, options).await?;
            Ok(())
        }
        Commands::Keygen { out_dir, force } => keys::keygen(&ctx, out_dir.as_deref(), force),
        Commands::Sign { file, key } => keys::sign(&file, &key),
        Commands::Verify {
            file,
            signature,
            signature_file,
            public_key,
            public_key_file,
        } => keys::verify(
            &ctx,
            VerifyArgs {
                file,
                signature,
                signature_file,
                public_key,
                public_key_file,
            },
        ),
        Commands::Skip { version, clear } => skip::skip(&ctx, version.as_deref(), clear),
        Commands::Convert {
            input,
            output,
            from,
            to,
            pretty,
        } => convert::convert(
            &input,
            output.as_deref(),
            from.map(Into::into),
            to.map(Into::into),
            pretty,
        ),
    }
}
