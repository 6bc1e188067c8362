use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, warn};

use appcast_model::{SecurityMode, TrustPolicy, ValidationResult};

use crate::keys::PublicKeySource;

/// Checks detached signatures against the configured trust policy.
pub trait SignatureVerifier: Send + Sync {
    fn security_mode(&self) -> SecurityMode;

    fn has_valid_key_material(&self) -> bool;

    fn trust_policy(&self) -> TrustPolicy {
        TrustPolicy::new(self.security_mode(), self.has_valid_key_material())
    }

    fn is_signature_needed(&self, is_software_download: bool) -> bool {
        self.trust_policy().is_signature_needed(is_software_download)
    }

    /// Verify `signature` (base64) over `payload`.
    ///
    /// A present signature is always checked when a key is available, even if
    /// policy would not require it. Without a signature or a key the result is
    /// `Invalid` when policy requires a signature and `Unchecked` otherwise.
    /// Malformed signatures are `Invalid`.
    fn verify(
        &self,
        signature: Option<&str>,
        payload: &[u8],
        is_software_download: bool,
    ) -> ValidationResult;
}

/// [`SignatureVerifier`] backed by an Ed25519 public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    mode: SecurityMode,
    key: Option<VerifyingKey>,
}

impl Ed25519Verifier {
    #[must_use]
    pub fn new(mode: SecurityMode, key: Option<VerifyingKey>) -> Self {
        Self { mode, key }
    }

    /// Build a verifier from configured key material. A key that fails to load
    /// is logged and treated as absent, so strict policies reject everything
    /// rather than trusting unverifiable input.
    #[must_use]
    pub fn from_source(mode: SecurityMode, source: Option<&PublicKeySource>) -> Self {
        let key = source.and_then(|source| match source.load() {
            Ok(key) => Some(key),
            Err(error) => {
                warn!("Ignoring unusable public key: {error}");
                None
            }
        });
        Self::new(mode, key)
    }

    #[must_use]
    pub fn key(&self) -> Option<&VerifyingKey> {
        self.key.as_ref()
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn security_mode(&self) -> SecurityMode {
        self.mode
    }

    fn has_valid_key_material(&self) -> bool {
        self.key.is_some()
    }

    fn verify(
        &self,
        signature: Option<&str>,
        payload: &[u8],
        is_software_download: bool,
    ) -> ValidationResult {
        let needed = self.is_signature_needed(is_software_download);
        let signature = signature.map(str::trim).filter(|sig| !sig.is_empty());

        match (signature, &self.key) {
            (Some(signature), Some(key)) => check_signature(key, signature, payload),
            (signature, key) if needed => {
                debug!(
                    "Signature required by {} mode but unavailable (signature: {}, key: {})",
                    self.mode,
                    signature.is_some(),
                    key.is_some()
                );
                ValidationResult::Invalid
            }
            _ => ValidationResult::Unchecked,
        }
    }
}

fn check_signature(key: &VerifyingKey, encoded: &str, payload: &[u8]) -> ValidationResult {
    let Ok(bytes) = STANDARD.decode(encoded) else {
        debug!("Signature is not valid base64");
        return ValidationResult::Invalid;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        debug!("Signature has wrong length: {} bytes", bytes.len());
        return ValidationResult::Invalid;
    };

    if key.verify(payload, &signature).is_ok() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid
    }
}
