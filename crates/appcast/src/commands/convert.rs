use std::path::Path;

use appcast_core::codec::{CodecError, ManifestFormat};

use crate::error::CliError;

pub fn convert(
    input: &Path,
    output: Option<&Path>,
    from: Option<ManifestFormat>,
    to: Option<ManifestFormat>,
    pretty: bool,
) -> Result<(), CliError> {
    let from = from.unwrap_or_else(|| ManifestFormat::from_path(input));
    let to = to
        .or_else(|| {
            output
                .filter(|path| path.extension().is_some())
                .map(ManifestFormat::from_path)
        })
        .unwrap_or_else(|| opposite(from));

    let raw = std::fs::read_to_string(input)
        .map_err(|error| CliError::io("failed to read", input, error))?;
    let converted = convert_text(&raw, from, to, pretty)?;

    match output {
        Some(path) => {
            std::fs::write(path, converted)
                .map_err(|error| CliError::io("failed to write", path, error))?;
            log::info!(
                "Converted {} ({from}) to {} ({to})",
                input.display(),
                path.display()
            );
        }
        None => println!("{converted}"),
    }
    Ok(())
}

fn convert_text(
    raw: &str,
    from: ManifestFormat,
    to: ManifestFormat,
    pretty: bool,
) -> Result<String, CodecError> {
    let manifest = from.codec(false).decode(raw)?;
    to.codec(pretty).encode(&manifest)
}

fn opposite(format: ManifestFormat) -> ManifestFormat {
    match format {
        ManifestFormat::Xml => ManifestFormat::Json,
        ManifestFormat::Json => ManifestFormat::Xml,
    }
}
