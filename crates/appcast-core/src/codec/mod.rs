//! Wire formats for manifests.
//!
//! Both codecs map the same [`Manifest`] model. Decoding is lenient: a missing
//! or malformed field falls back to its documented default, and only a document
//! that is not XML (or not a JSON object) at all is an error.

mod dates;
mod json;
mod xml;

use std::path::Path;

use appcast_model::Manifest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use json::JsonCodec;
pub use xml::XmlCodec;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed XML manifest: {0}")]
    Xml(String),
    #[error("malformed JSON manifest: {0}")]
    Json(#[source] serde_json::Error),
    #[error("manifest document has no {expected}")]
    MissingRoot { expected: &'static str },
    #[error("failed to write {format} manifest: {details}")]
    Write {
        format: ManifestFormat,
        details: String,
    },
}

impl CodecError {
    fn write(format: ManifestFormat, error: impl std::fmt::Display) -> Self {
        Self::Write {
            format,
            details: error.to_string(),
        }
    }
}

/// Bidirectional mapping between manifest text and the [`Manifest`] model.
pub trait ManifestCodec: Send + Sync {
    fn format(&self) -> ManifestFormat;

    /// Parse manifest text. Items come back sorted newest first.
    ///
    /// # Errors
    /// Returns an error only when the document itself cannot be read; field
    /// level problems resolve to defaults.
    fn decode(&self, raw: &str) -> Result<Manifest, CodecError>;

    /// Serialize a manifest.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    fn encode(&self, manifest: &Manifest) -> Result<String, CodecError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Xml,
    Json,
}

impl ManifestFormat {
    /// Build the codec for this format. `pretty` only affects JSON output;
    /// XML is always indented.
    #[must_use]
    pub fn codec(self, pretty: bool) -> Box<dyn ManifestCodec> {
        match self {
            Self::Xml => Box::new(XmlCodec),
            Self::Json => Box::new(JsonCodec { pretty }),
        }
    }

    /// Guess the format from a file name or URL, defaulting to XML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            Self::Json
        } else {
            Self::Xml
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xml => write!(f, "XML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// Parse a criticality flag. `true` and `1` (any case) are critical.
fn parse_critical(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

/// Parse a byte count, treating anything unparseable as zero.
fn parse_size(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ManifestFormat, parse_critical, parse_size};

    #[test]
    fn format_detection_uses_extension() {
        assert_eq!(
            ManifestFormat::from_path(Path::new("appcast.JSON")),
            ManifestFormat::Json
        );
        assert_eq!(
            ManifestFormat::from_path(Path::new("appcast.xml")),
            ManifestFormat::Xml
        );
        assert_eq!(
            ManifestFormat::from_path(Path::new("appcast")),
            ManifestFormat::Xml
        );
    }

    #[test]
    fn codec_matches_requested_format() {
        assert_eq!(ManifestFormat::Xml.codec(false).format(), ManifestFormat::Xml);
        assert_eq!(ManifestFormat::Json.codec(true).format(), ManifestFormat::Json);
    }

    #[test]
    fn lenient_scalar_parsing() {
        assert!(parse_critical("TRUE"));
        assert!(parse_critical(" 1 "));
        assert!(!parse_critical("yes"));
        assert!(!parse_critical(""));

        assert_eq!(parse_size("1024"), 1024);
        assert_eq!(parse_size(" 42 "), 42);
        assert_eq!(parse_size("-5"), 0);
        assert_eq!(parse_size("big"), 0);
    }
}
