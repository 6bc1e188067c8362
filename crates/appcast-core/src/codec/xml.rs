use std::borrow::Cow;

use appcast_model::{
    DEFAULT_LANGUAGE, DEFAULT_MIME_TYPE, DEFAULT_OPERATING_SYSTEM, Manifest, ManifestItem,
    VersionKey,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;

use super::dates::{format_publication_date, parse_publication_date};
use super::{CodecError, ManifestCodec, ManifestFormat, parse_critical, parse_size};

pub const SPARKLE_NAMESPACE: &str = "http://www.andymatuschak.org/xml-namespaces/sparkle";

/// Signature attribute names, highest priority first.
const SIGNATURE_ATTRIBUTES: [&str; 3] = [
    "sparkle:signature",
    "sparkle:dsaSignature",
    "sparkle:edSignature",
];

const VERSION: &str = "sparkle:version";
const SHORT_VERSION: &str = "sparkle:shortVersionString";
const OPERATING_SYSTEM: &str = "sparkle:os";
const CRITICAL_UPDATE: &str = "sparkle:criticalUpdate";
const RELEASE_NOTES_LINK: &str = "sparkle:releaseNotesLink";
const CHANNEL: &str = "sparkle:channel";

/// RSS 2.0 appcast with the Sparkle namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl ManifestCodec for XmlCodec {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Xml
    }

    fn decode(&self, raw: &str) -> Result<Manifest, CodecError> {
        let root = parse_tree(raw)?;

        // Accept a bare <channel> as well as <rss><channel>.
        let channel = if root.name == "channel" {
            Some(&root)
        } else {
            root.child("channel")
        };

        let mut manifest = Manifest::default();
        let Some(channel) = channel else {
            return Ok(manifest);
        };

        manifest.title = channel.child_text("title");
        manifest.link = channel.child_text("link");
        manifest.description = channel.child_text("description");
        let language = channel.child_text("language");
        manifest.language = if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language
        };

        manifest.items = channel.children_named("item").map(decode_item).collect();
        manifest.sort_newest_first();
        Ok(manifest)
    }

    fn encode(&self, manifest: &Manifest) -> Result<String, CodecError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_manifest(&mut writer, manifest)?;
        String::from_utf8(writer.into_inner())
            .map_err(|error| CodecError::write(ManifestFormat::Xml, error))
    }
}

fn decode_item(element: &Element) -> ManifestItem {
    let enclosure = element.child("enclosure");
    let enclosure_attr = |name: &str| {
        enclosure
            .and_then(|enclosure| enclosure.attribute(name))
            .unwrap_or_default()
    };
    // Newer appcasts carry some enclosure attributes as child elements.
    let attr_or_element = |name: &str| {
        let value = enclosure_attr(name);
        if value.is_empty() {
            element.child_text(name)
        } else {
            value.to_string()
        }
    };

    let (release_notes_link, release_notes_signature) = element
        .child(RELEASE_NOTES_LINK)
        .map(|notes| {
            (
                notes.text.trim().to_string(),
                first_signature(notes).unwrap_or_default().to_string(),
            )
        })
        .unwrap_or_default();

    let operating_system = enclosure_attr(OPERATING_SYSTEM).trim();
    let mime_type = enclosure_attr("type").trim();

    let is_critical = parse_critical(enclosure_attr(CRITICAL_UPDATE))
        || element.child(CRITICAL_UPDATE).is_some_and(|critical| {
            // `<sparkle:criticalUpdate />` with no content marks the item critical.
            critical.text.trim().is_empty() || parse_critical(&critical.text)
        });

    ManifestItem {
        title: element.child_text("title"),
        version: VersionKey::parse(&attr_or_element(VERSION)),
        short_version: attr_or_element(SHORT_VERSION),
        release_notes_link,
        release_notes_signature,
        description: element.child_text("description"),
        download_link: enclosure_attr("url").trim().to_string(),
        download_signature: enclosure
            .and_then(first_signature)
            .unwrap_or_default()
            .to_string(),
        publication_date: parse_publication_date(&element.child_text("pubDate")),
        is_critical,
        update_size: parse_size(enclosure_attr("length")),
        operating_system: if operating_system.is_empty() {
            DEFAULT_OPERATING_SYSTEM.to_string()
        } else {
            operating_system.to_string()
        },
        mime_type: if mime_type.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type.to_string()
        },
        channel: element.child_text(CHANNEL),
    }
}

fn first_signature(element: &Element) -> Option<&str> {
    SIGNATURE_ATTRIBUTES
        .iter()
        .filter_map(|name| element.attribute(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn write_manifest<W: std::io::Write>(
    writer: &mut Writer<W>,
    manifest: &Manifest,
) -> Result<(), CodecError> {
    emit(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:sparkle", SPARKLE_NAMESPACE));
    emit(writer, Event::Start(rss))?;
    emit(writer, Event::Start(BytesStart::new("channel")))?;

    write_text_element(writer, "title", &manifest.title)?;
    write_text_element(writer, "link", &manifest.link)?;
    write_text_element(writer, "description", &manifest.description)?;
    write_text_element(writer, "language", &manifest.language)?;

    for item in &manifest.items {
        write_item(writer, item)?;
    }

    emit(writer, Event::End(BytesEnd::new("channel")))?;
    emit(writer, Event::End(BytesEnd::new("rss")))
}

fn write_item<W: std::io::Write>(
    writer: &mut Writer<W>,
    item: &ManifestItem,
) -> Result<(), CodecError> {
    emit(writer, Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;

    if !item.release_notes_link.is_empty() {
        let mut notes = BytesStart::new(RELEASE_NOTES_LINK);
        if !item.release_notes_signature.is_empty() {
            notes.push_attribute((SIGNATURE_ATTRIBUTES[0], item.release_notes_signature.as_str()));
        }
        emit(writer, Event::Start(notes))?;
        emit(writer, Event::Text(BytesText::new(&item.release_notes_link)))?;
        emit(writer, Event::End(BytesEnd::new(RELEASE_NOTES_LINK)))?;
    }

    if !item.description.is_empty() {
        write_text_element(writer, "description", &item.description)?;
    }
    if let Some(date) = &item.publication_date {
        write_text_element(writer, "pubDate", &format_publication_date(date))?;
    }
    if !item.channel.is_empty() {
        write_text_element(writer, CHANNEL, &item.channel)?;
    }

    let size = item.update_size.to_string();
    let mut enclosure = BytesStart::new("enclosure");
    if !item.download_link.is_empty() {
        enclosure.push_attribute(("url", item.download_link.as_str()));
    }
    if !item.version.is_empty() {
        enclosure.push_attribute((VERSION, item.version.as_str()));
    }
    if !item.short_version.is_empty() {
        enclosure.push_attribute((SHORT_VERSION, item.short_version.as_str()));
    }
    enclosure.push_attribute(("length", size.as_str()));
    enclosure.push_attribute((OPERATING_SYSTEM, item.operating_system.as_str()));
    enclosure.push_attribute(("type", item.mime_type.as_str()));
    if !item.download_signature.is_empty() {
        enclosure.push_attribute((SIGNATURE_ATTRIBUTES[0], item.download_signature.as_str()));
    }
    if item.is_critical {
        enclosure.push_attribute((CRITICAL_UPDATE, "true"));
    }
    emit(writer, Event::Empty(enclosure))?;

    emit(writer, Event::End(BytesEnd::new("item")))
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), CodecError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), CodecError> {
    writer
        .write_event(event)
        .map_err(|error| CodecError::write(ManifestFormat::Xml, error))
}

/// Minimal owned element tree; manifests are small enough to hold in memory.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let attributes = start
            .attributes()
            .flatten()
            .map(|attribute| {
                let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                let value = attribute.unescape_value().map_or_else(
                    |_| String::from_utf8_lossy(&attribute.value).into_owned(),
                    Cow::into_owned,
                );
                (key, value)
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Self::default()
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|child| child.text.trim().to_string())
            .unwrap_or_default()
    }
}

fn parse_tree(raw: &str) -> Result<Element, CodecError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Element::from_start(&start)),
            Ok(Event::Empty(start)) => attach(&mut stack, &mut root, Element::from_start(&start)),
            Ok(Event::End(_)) => {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut root, done);
                }
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let decoded = text.unescape().map_or_else(
                        |_| String::from_utf8_lossy(&text).into_owned(),
                        Cow::into_owned,
                    );
                    current.text.push_str(&decoded);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(CodecError::Xml(error.to_string())),
        }
    }

    // Unclosed elements at end of input are folded into their parents.
    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut root, done);
    }

    root.ok_or(CodecError::MissingRoot {
        expected: "root element",
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
