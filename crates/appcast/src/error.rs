use std::path::{Path, PathBuf};

use thiserror::Error;

use appcast_core::codec::CodecError;
use appcast_core::{CheckError, DownloadError, FetchError, KeyError};
use appcast_model::ValidationResult;
use appcast_platform::AppPathsError;

use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Paths(#[from] AppPathsError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("update check failed: {0}")]
    Check(#[from] CheckError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Usage(&'static str),
    #[error("signature check result: {0}")]
    NotVerified(ValidationResult),
}

impl CliError {
    pub fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}
