use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, Signer, SigningKey, VerifyingKey};
use log::debug;
use thiserror::Error;

pub const PRIVATE_KEY_FILE: &str = "appcast_ed25519.priv";
pub const PUBLIC_KEY_FILE: &str = "appcast_ed25519.pub";

/// Seed followed by the public half, as produced by most Ed25519 tooling.
const KEYPAIR_LENGTH: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Base64 {
        context: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("{context}: expected {expected} bytes, got {actual}")]
    Length {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{context}: {source}")]
    Invalid {
        context: &'static str,
        #[source]
        source: ed25519_dalek::SignatureError,
    },
    #[error("{} already exists", path.display())]
    AlreadyExists { path: PathBuf },
}

impl KeyError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    fn base64(context: &'static str, source: base64::DecodeError) -> Self {
        Self::Base64 { context, source }
    }
}

/// Where the public key used for verification comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    /// Base64 key text embedded in configuration.
    Inline(String),
    /// File containing base64 key text.
    File(PathBuf),
}

impl PublicKeySource {
    /// Resolve the source to a verifying key.
    ///
    /// # Errors
    /// Returns an error if the key file cannot be read or the key text is not
    /// a base64 encoded 32-byte Ed25519 public key.
    pub fn load(&self) -> Result<VerifyingKey, KeyError> {
        match self {
            Self::Inline(text) => decode_public_key(text),
            Self::File(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|error| KeyError::io("failed to read public key", path, error))?;
                debug!("Loaded public key from {}", path.display());
                decode_public_key(&text)
            }
        }
    }
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns an error for malformed base64, a wrong length, or bytes that are
/// not a valid curve point.
pub fn decode_public_key(text: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|error| KeyError::base64("malformed public key", error))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] =
        bytes.as_slice().try_into().map_err(|_| KeyError::Length {
            context: "malformed public key",
            expected: PUBLIC_KEY_LENGTH,
            actual: bytes.len(),
        })?;
    VerifyingKey::from_bytes(&bytes).map_err(|source| KeyError::Invalid {
        context: "public key is not a valid Ed25519 point",
        source,
    })
}

#[must_use]
pub fn encode_public_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

/// An Ed25519 signing key, used by publishers to sign manifests and
/// artifacts.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut rand_core::OsRng),
        }
    }

    /// Import a private key from base64. Both a bare 32-byte seed and the
    /// 64-byte seed plus public key layout are accepted.
    ///
    /// # Errors
    /// Returns an error if the text is not base64 or has an unexpected length,
    /// or if a 64-byte key's public half does not match its seed.
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|error| KeyError::base64("malformed private key", error))?;

        let signing = match bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = [0_u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LENGTH => {
                let mut keypair = [0_u8; KEYPAIR_LENGTH];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(|source| KeyError::Invalid {
                    context: "private key does not match its public half",
                    source,
                })?
            }
            actual => {
                return Err(KeyError::Length {
                    context: "malformed private key",
                    expected: SECRET_KEY_LENGTH,
                    actual,
                });
            }
        };

        Ok(Self { signing })
    }

    /// Read a base64 private key from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not hold a valid
    /// key.
    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|error| KeyError::io("failed to read private key", path, error))?;
        Self::from_base64(&text)
    }

    #[must_use]
    pub fn private_key_base64(&self) -> String {
        STANDARD.encode(self.signing.to_bytes())
    }

    #[must_use]
    pub fn public_key_base64(&self) -> String {
        encode_public_key(&self.signing.verifying_key())
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Base64 signature over `payload`.
    #[must_use]
    pub fn sign_bytes(&self, payload: &[u8]) -> String {
        STANDARD.encode(self.signing.sign(payload).to_bytes())
    }

    /// Base64 signature over the contents of a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn sign_file(&self, path: &Path) -> Result<String, KeyError> {
        let payload = std::fs::read(path)
            .map_err(|error| KeyError::io("failed to read file to sign", path, error))?;
        Ok(self.sign_bytes(&payload))
    }

    /// Write the private and public key files into `dir`, returning their
    /// paths. Existing keys are never overwritten unless `force` is set.
    ///
    /// # Errors
    /// Returns an error if a key file exists and `force` is false, or if the
    /// directory or files cannot be written.
    pub fn write_to_dir(&self, dir: &Path, force: bool) -> Result<(PathBuf, PathBuf), KeyError> {
        let private_path = dir.join(PRIVATE_KEY_FILE);
        let public_path = dir.join(PUBLIC_KEY_FILE);

        if !force
            && let Some(existing) = [&private_path, &public_path]
                .into_iter()
                .find(|path| path.exists())
        {
            return Err(KeyError::AlreadyExists {
                path: existing.clone(),
            });
        }

        std::fs::create_dir_all(dir)
            .map_err(|error| KeyError::io("failed to create key directory", dir, error))?;
        write_key_file(&private_path, &self.private_key_base64(), force, true)?;
        write_key_file(&public_path, &self.public_key_base64(), force, false)?;

        Ok((private_path, public_path))
    }
}

/// Write one key file. Without `force` the file must not exist yet. Secret
/// files are owner-only on unix from the moment they are created.
fn write_key_file(
    path: &Path,
    contents: &str,
    force: bool,
    secret: bool,
) -> Result<(), KeyError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if secret {
            options.mode(0o600);
        }
    }

    let mut file = options.open(path).map_err(|error| {
        if error.kind() == std::io::ErrorKind::AlreadyExists {
            KeyError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            KeyError::io("failed to create key file", path, error)
        }
    })?;

    // `mode` only applies to new files; an overwritten key keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if secret {
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|error| KeyError::io("failed to restrict key file", path, error))?;
        }
    }
    #[cfg(not(unix))]
    let _ = secret;

    file.write_all(contents.as_bytes())
        .map_err(|error| KeyError::io("failed to write key file", path, error))
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_base64())
            .finish_non_exhaustive()
    }
}
