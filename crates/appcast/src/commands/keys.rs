use std::path::{Path, PathBuf};

use appcast_core::{Ed25519Verifier, KeyPair, PublicKeySource, SignatureVerifier};
use appcast_model::{SecurityMode, ValidationResult};

use crate::commands::Context;
use crate::error::CliError;

pub fn keygen(ctx: &Context, out_dir: Option<&Path>, force: bool) -> Result<(), CliError> {
    let dir = out_dir.unwrap_or(&ctx.paths.config_dir);
    let pair = KeyPair::generate();
    let (private_path, public_path) = pair.write_to_dir(dir, force)?;

    println!("Private key: {}", private_path.display());
    println!("Public key:  {}", public_path.display());
    println!();
    println!("Keep the private key secret. Ship this public key with your application:");
    println!("{}", pair.public_key_base64());
    Ok(())
}

pub fn sign(file: &Path, key: &Path) -> Result<(), CliError> {
    let pair = KeyPair::from_file(key)?;
    println!("{}", pair.sign_file(file)?);
    Ok(())
}

pub struct VerifyArgs {
    pub file: PathBuf,
    pub signature: Option<String>,
    pub signature_file: Option<PathBuf>,
    pub public_key: Option<String>,
    pub public_key_file: Option<PathBuf>,
}

pub fn verify(ctx: &Context, args: VerifyArgs) -> Result<(), CliError> {
    let source = match (args.public_key, args.public_key_file) {
        (Some(key), _) => PublicKeySource::Inline(key),
        (None, Some(path)) => PublicKeySource::File(path),
        (None, None) => ctx.settings.public_key_source().ok_or(CliError::Usage(
            "no public key given; pass --public-key or configure public_key",
        ))?,
    };
    let key = source.load()?;

    let signature = match (args.signature, args.signature_file) {
        (Some(signature), _) => signature,
        (None, Some(path)) => read_text(&path)?,
        (None, None) => {
            let path = detached_signature_path(&args.file, &ctx.settings.signature_extension);
            read_text(&path)?
        }
    };

    let payload =
        std::fs::read(&args.file).map_err(|error| CliError::io("failed to read", &args.file, error))?;
    let verifier = Ed25519Verifier::new(SecurityMode::Strict, Some(key));
    let result = verifier.verify(Some(&signature), &payload, true);

    println!("{}: {result}", args.file.display());
    if result == ValidationResult::Valid {
        Ok(())
    } else {
        Err(CliError::NotVerified(result))
    }
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|error| CliError::io("failed to read", path, error))
}

fn detached_signature_path(file: &Path, extension: &str) -> PathBuf {
    let extension = extension.trim().trim_start_matches('.');
    let mut name = file.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
