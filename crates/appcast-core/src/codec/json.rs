use appcast_model::{
    DEFAULT_LANGUAGE, DEFAULT_MIME_TYPE, DEFAULT_OPERATING_SYSTEM, Manifest, ManifestItem,
    VersionKey,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::dates::parse_publication_date;
use super::{CodecError, ManifestCodec, ManifestFormat, parse_critical, parse_size};

/// JSON appcast. `pretty` selects indented output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl ManifestCodec for JsonCodec {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Json
    }

    fn decode(&self, raw: &str) -> Result<Manifest, CodecError> {
        let value: Value = serde_json::from_str(raw).map_err(CodecError::Json)?;
        let Value::Object(root) = value else {
            return Err(CodecError::MissingRoot {
                expected: "top-level JSON object",
            });
        };

        let language = string_field(&root, "language");
        let mut manifest = Manifest {
            title: string_field(&root, "title"),
            language: if language.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                language
            },
            link: string_field(&root, "link"),
            description: string_field(&root, "description"),
            items: root
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(decode_item)
                        .collect()
                })
                .unwrap_or_default(),
        };

        manifest.sort_newest_first();
        Ok(manifest)
    }

    fn encode(&self, manifest: &Manifest) -> Result<String, CodecError> {
        let wire = WireManifest::from(manifest);
        let encoded = if self.pretty {
            serde_json::to_string_pretty(&wire)
        } else {
            serde_json::to_string(&wire)
        };
        encoded.map_err(|error| CodecError::write(ManifestFormat::Json, error))
    }
}

fn decode_item(object: &Map<String, Value>) -> ManifestItem {
    let operating_system = string_field(object, "os");
    let mime_type = string_field(object, "type");

    ManifestItem {
        title: string_field(object, "title"),
        version: VersionKey::parse(&string_field(object, "version")),
        short_version: string_field(object, "short_version"),
        release_notes_link: string_field(object, "release_notes_link"),
        release_notes_signature: string_field(object, "release_notes_signature"),
        description: string_field(object, "description"),
        download_link: string_field(object, "url"),
        download_signature: string_field(object, "signature"),
        publication_date: parse_publication_date(&string_field(object, "publication_date")),
        is_critical: bool_field(object, "is_critical"),
        update_size: u64_field(object, "size"),
        operating_system: if operating_system.is_empty() {
            DEFAULT_OPERATING_SYSTEM.to_string()
        } else {
            operating_system
        },
        mime_type: if mime_type.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type
        },
        channel: string_field(object, "channel"),
    }
}

/// Strings are taken as-is; numbers and booleans are stringified; anything
/// else is empty.
fn string_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn bool_field(object: &Map<String, Value>, key: &str) -> bool {
    match object.get(key) {
        Some(Value::Bool(value)) => *value,
        Some(Value::Number(value)) => value.as_u64() == Some(1),
        Some(Value::String(value)) => parse_critical(value),
        _ => false,
    }
}

fn u64_field(object: &Map<String, Value>, key: &str) -> u64 {
    match object.get(key) {
        Some(Value::Number(value)) => value.as_u64().unwrap_or(0),
        Some(Value::String(value)) => parse_size(value),
        _ => 0,
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_blank(value: &&str) -> bool {
    value.is_empty()
}

#[derive(Serialize)]
struct WireManifest<'a> {
    title: &'a str,
    language: &'a str,
    link: &'a str,
    description: &'a str,
    items: Vec<WireItem<'a>>,
}

#[derive(Serialize)]
struct WireItem<'a> {
    title: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    short_version: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    release_notes_link: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    release_notes_signature: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    description: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    signature: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    publication_date: Option<String>,
    is_critical: bool,
    size: u64,
    os: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    channel: &'a str,
}

impl<'a> From<&'a Manifest> for WireManifest<'a> {
    fn from(manifest: &'a Manifest) -> Self {
        Self {
            title: &manifest.title,
            language: &manifest.language,
            link: &manifest.link,
            description: &manifest.description,
            items: manifest.items.iter().map(WireItem::from).collect(),
        }
    }
}

impl<'a> From<&'a ManifestItem> for WireItem<'a> {
    fn from(item: &'a ManifestItem) -> Self {
        Self {
            title: &item.title,
            version: item.version.as_str(),
            short_version: &item.short_version,
            release_notes_link: &item.release_notes_link,
            release_notes_signature: &item.release_notes_signature,
            description: &item.description,
            url: &item.download_link,
            signature: &item.download_signature,
            publication_date: item.publication_date.map(|date| date.to_rfc3339()),
            is_critical: item.is_critical,
            size: item.update_size,
            os: &item.operating_system,
            mime_type: &item.mime_type,
            channel: &item.channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use appcast_model::{Manifest, ManifestItem, VersionKey};
    use chrono::{TimeZone, Utc};

    use super::JsonCodec;
    use crate::codec::{CodecError, ManifestCodec, XmlCodec};

    fn full_manifest() -> Manifest {
        Manifest {
            title: "Example".to_string(),
            language: "en-GB".to_string(),
            link: "https://example.com/appcast.json".to_string(),
            description: "Release feed".to_string(),
            items: vec![
                ManifestItem {
                    title: "Version 2.1.0".to_string(),
                    version: VersionKey::parse("2.1.0"),
                    short_version: "2.1".to_string(),
                    release_notes_link: "https://example.com/notes/2.1.0.md".to_string(),
                    release_notes_signature: "bm90ZXM=".to_string(),
                    description: "# Changes\n- faster".to_string(),
                    download_link: "https://example.com/app-2.1.0.tar.gz".to_string(),
                    download_signature: "c2ln".to_string(),
                    publication_date: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).single(),
                    is_critical: true,
                    update_size: 4096,
                    operating_system: "linux".to_string(),
                    mime_type: "application/gzip".to_string(),
                    channel: "stable".to_string(),
                },
                ManifestItem::new("2.0.0", "https://example.com/app-2.0.0.tar.gz"),
            ],
        }
    }

    #[test]
    fn empty_object_uses_defaults() {
        let manifest = JsonCodec::default()
            .decode("{}")
            .expect("empty object should decode");
        assert_eq!(manifest.language, "en");
        assert!(manifest.items.is_empty());
    }

    #[test]
    fn non_object_documents_are_errors() {
        assert!(matches!(
            JsonCodec::default().decode("[]"),
            Err(CodecError::MissingRoot { .. })
        ));
        assert!(matches!(
            JsonCodec::default().decode("{ not json"),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn mistyped_fields_become_zero_values() {
        let raw = r#"{
            "title": 7,
            "items": [
                {"version": "1.0.0", "size": "huge", "is_critical": "nope", "publication_date": 12},
                {"version": 2, "size": "2048", "is_critical": 1, "os": "mac"},
                "not an item"
            ]
        }"#;

        let manifest = JsonCodec::default()
            .decode(raw)
            .expect("lenient decode should succeed");
        assert_eq!(manifest.title, "7");
        assert_eq!(manifest.items.len(), 2);

        let numeric = &manifest.items[0];
        assert_eq!(numeric.version.as_str(), "2");
        assert_eq!(numeric.update_size, 2048);
        assert!(numeric.is_critical);
        assert!(numeric.is_mac_update());

        let stringly = &manifest.items[1];
        assert_eq!(stringly.update_size, 0);
        assert!(!stringly.is_critical);
        assert!(stringly.publication_date.is_none());
        assert_eq!(stringly.operating_system, "windows");
        assert_eq!(stringly.mime_type, "application/octet-stream");
    }

    #[test]
    fn accepts_rss_style_dates() {
        let raw = r#"{"items": [{"version": "1.0.0", "publication_date": "Mon, 15 Jan 2024 10:30:00 GMT"}]}"#;
        let manifest = JsonCodec::default().decode(raw).expect("manifest should decode");
        assert_eq!(
            manifest.items[0].publication_date,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).single()
        );
    }

    #[test]
    fn pretty_output_is_indented() {
        let manifest = full_manifest();
        let compact = JsonCodec { pretty: false }
            .encode(&manifest)
            .expect("compact encode should succeed");
        let pretty = JsonCodec { pretty: true }
            .encode(&manifest)
            .expect("pretty encode should succeed");

        assert!(!compact.contains('\n'));
        assert!(pretty.contains("\n  \"title\""));
    }

    #[test]
    fn round_trip_preserves_fields() {
        let manifest = full_manifest();
        let codec = JsonCodec { pretty: true };
        let decoded = codec
            .decode(&codec.encode(&manifest).expect("manifest should encode"))
            .expect("encoded manifest should decode");

        assert_eq!(decoded.title, manifest.title);
        assert_eq!(decoded.language, manifest.language);
        assert_eq!(decoded.link, manifest.link);
        assert_eq!(decoded.description, manifest.description);
        assert_eq!(decoded.items.len(), 2);

        for (item, original) in decoded.items.iter().zip(&manifest.items) {
            assert_eq!(item.title, original.title);
            assert_eq!(item.version.as_str(), original.version.as_str());
            assert_eq!(item.short_version, original.short_version);
            assert_eq!(item.release_notes_link, original.release_notes_link);
            assert_eq!(item.release_notes_signature, original.release_notes_signature);
            assert_eq!(item.description, original.description);
            assert_eq!(item.download_link, original.download_link);
            assert_eq!(item.download_signature, original.download_signature);
            assert_eq!(item.publication_date, original.publication_date);
            assert_eq!(item.is_critical, original.is_critical);
            assert_eq!(item.update_size, original.update_size);
            assert_eq!(item.operating_system, original.operating_system);
            assert_eq!(item.mime_type, original.mime_type);
            assert_eq!(item.channel, original.channel);
        }
    }

    #[test]
    fn xml_and_json_describe_the_same_model() {
        let manifest = full_manifest();
        let xml = XmlCodec.encode(&manifest).expect("xml encode should succeed");
        let from_xml = XmlCodec.decode(&xml).expect("xml decode should succeed");

        let json = JsonCodec::default()
            .encode(&from_xml)
            .expect("json encode should succeed");
        let from_json = JsonCodec::default()
            .decode(&json)
            .expect("json decode should succeed");

        let versions: Vec<&str> = from_json
            .items
            .iter()
            .map(|item| item.version.as_str())
            .collect();
        assert_eq!(versions, vec!["2.1.0", "2.0.0"]);
        assert_eq!(from_json.items[0].download_signature, "c2ln");
        assert_eq!(
            from_json.items[0].publication_date,
            manifest.items[0].publication_date
        );
    }
}
