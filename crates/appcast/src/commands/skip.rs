use crate::commands::Context;
use crate::error::CliError;

pub fn skip(ctx: &Context, version: Option<&str>, clear: bool) -> Result<(), CliError> {
    let mut settings = ctx.settings.clone();
    settings.last_skipped_version = if clear {
        None
    } else {
        version
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .map(str::to_string)
    };

    settings.save_to(&ctx.settings_path)?;

    match &settings.last_skipped_version {
        Some(version) => println!("Version {version} will not be offered"),
        None => println!("No version is skipped"),
    }
    Ok(())
}
