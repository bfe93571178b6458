//! Core document properties (`docProps/core.xml`)
//!
//! ```xml
//! <cp:coreProperties ...>
//!   <dc:title>Quarterly report</dc:title>
//!   <dc:creator>John Doe</dc:creator>
//!   <cp:lastModifiedBy>Jane Roe</cp:lastModifiedBy>
//!   <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-15T10:30:00Z</dcterms:created>
//!   <dcterms:modified xsi:type="dcterms:W3CDTF">2024-01-20T14:45:00Z</dcterms:modified>
//! </cp:coreProperties>
//! ```

use crate::error::Result;
use crate::rules::Replacement;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

const ROOT: &[u8] = b"cp:coreProperties";
const TITLE: &[u8] = b"dc:title";
const CREATOR: &[u8] = b"dc:creator";
const LAST_MODIFIED_BY: &[u8] = b"cp:lastModifiedBy";
const CREATED: &[u8] = b"dcterms:created";
const MODIFIED: &[u8] = b"dcterms:modified";

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Core properties part used when a package has none
pub const EMPTY_CORE_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\r\n",
    r#"<cp:coreProperties"#,
    r#" xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties""#,
    r#" xmlns:dc="http://purl.org/dc/elements/1.1/""#,
    r#" xmlns:dcterms="http://purl.org/dc/terms/""#,
    r#" xmlns:dcmitype="http://purl.org/dc/dcmitype/""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    r#"</cp:coreProperties>"#,
);

/// Properties read from `docProps/core.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub last_modified_by: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl CoreProperties {
    /// Parse the core properties part
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut props = Self::default();
        let mut current: Option<Vec<u8>> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => current = Some(e.name().as_ref().to_vec()),
                Event::Text(e) => {
                    let text = e.unescape()?;
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match current.as_deref() {
                        Some(TITLE) => props.title = Some(text.to_string()),
                        Some(CREATOR) => props.author = Some(text.to_string()),
                        Some(LAST_MODIFIED_BY) => props.last_modified_by = Some(text.to_string()),
                        Some(CREATED) => props.created = parse_datetime(text),
                        Some(MODIFIED) => props.modified = parse_datetime(text),
                        _ => {}
                    }
                }
                Event::End(_) => current = None,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(props)
    }
}

/// Office documents use W3CDTF (ISO 8601) timestamps
#[inline]
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Changes to apply to the core properties part
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreEdits<'a> {
    /// New `dc:creator`
    pub author: Option<&'a str>,
    /// New `cp:lastModifiedBy`
    pub last_modified_by: Option<&'a str>,
    /// Find-and-replace in an existing `dc:title`
    pub title: Option<&'a Replacement>,
}

/// Result of [`rewrite`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreRewrite {
    pub xml: String,
    pub title_changed: bool,
}

#[derive(Debug, Clone, Copy)]
enum Field<'a> {
    Set(&'a str),
    Title(&'a Replacement),
}

impl<'a> CoreEdits<'a> {
    fn field_for(&self, name: &[u8]) -> Option<Field<'a>> {
        match name {
            CREATOR => self.author.map(Field::Set),
            LAST_MODIFIED_BY => self.last_modified_by.map(Field::Set),
            TITLE => self.title.map(Field::Title),
            _ => None,
        }
    }
}

/// Apply `edits` to a core properties part
///
/// Author and last-modified-by are written even when the elements are
/// missing; the title is only changed when it exists and contains the
/// search text.
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn rewrite(xml: &str, edits: &CoreEdits<'_>) -> Result<CoreRewrite> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let mut seen_creator = false;
    let mut seen_last_modified_by = false;
    let mut title_changed = false;
    // element name, field, collected text
    let mut capture: Option<(Vec<u8>, Field<'_>, String)> = None;

    loop {
        let event = reader.read_event()?;

        if let Some((name, field, text)) = capture.as_mut() {
            match &event {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(c)),
                Event::End(e) if e.name().as_ref() == name.as_slice() => {
                    let new_text = match *field {
                        Field::Set(value) => value.to_string(),
                        Field::Title(rule) => match rule.apply(text) {
                            Some(replaced) => {
                                title_changed = true;
                                replaced
                            }
                            None => std::mem::take(text),
                        },
                    };
                    if !new_text.is_empty() {
                        writer.write_event(Event::Text(BytesText::new(&new_text)))?;
                    }
                    writer.write_event(&event)?;
                    capture = None;
                }
                Event::Eof => break,
                // Nothing else belongs inside these elements
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == ROOT => {
                writer.write_event(Event::Start(root_start(e, edits)))?;
            }
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if let Some(field) = edits.field_for(&name) {
                    mark_seen(&name, &mut seen_creator, &mut seen_last_modified_by);
                    capture = Some((name, field, String::new()));
                }
                writer.write_event(&event)?;
            }
            Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                if name.as_slice() == ROOT {
                    // <cp:coreProperties/>: expand so missing fields can be added
                    writer.write_event(Event::Start(root_start(e, edits)))?;
                    write_missing(&mut writer, edits, seen_creator, seen_last_modified_by)?;
                    writer.write_event(Event::End(e.to_end()))?;
                    seen_creator = true;
                    seen_last_modified_by = true;
                    continue;
                }
                match edits.field_for(&name) {
                    Some(Field::Set(value)) => {
                        mark_seen(&name, &mut seen_creator, &mut seen_last_modified_by);
                        writer.write_event(Event::Start(e.clone()))?;
                        writer.write_event(Event::Text(BytesText::new(value)))?;
                        writer.write_event(Event::End(e.to_end()))?;
                    }
                    _ => writer.write_event(&event)?,
                }
            }
            Event::End(e) if e.name().as_ref() == ROOT => {
                write_missing(&mut writer, edits, seen_creator, seen_last_modified_by)?;
                writer.write_event(&event)?;
            }
            _ => writer.write_event(&event)?,
        }
    }

    Ok(CoreRewrite {
        xml: String::from_utf8(writer.into_inner())?,
        title_changed,
    })
}

/// Root start tag, declaring the `dc` prefix when an author may be inserted
fn root_start(root: &BytesStart<'_>, edits: &CoreEdits<'_>) -> BytesStart<'static> {
    let mut root = root.clone().into_owned();
    let declared = root
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xmlns:dc");
    if edits.author.is_some() && !declared {
        root.push_attribute(("xmlns:dc", DC_NAMESPACE));
    }
    root
}

fn mark_seen(name: &[u8], seen_creator: &mut bool, seen_last_modified_by: &mut bool) {
    match name {
        CREATOR => *seen_creator = true,
        LAST_MODIFIED_BY => *seen_last_modified_by = true,
        _ => {}
    }
}

fn write_missing(
    writer: &mut Writer<Vec<u8>>,
    edits: &CoreEdits<'_>,
    seen_creator: bool,
    seen_last_modified_by: bool,
) -> Result<()> {
    if let (Some(author), false) = (edits.author, seen_creator) {
        write_text_element(writer, "dc:creator", author)?;
    }
    if let (Some(value), false) = (edits.last_modified_by, seen_last_modified_by) {
        write_text_element(writer, "cp:lastModifiedBy", value)?;
    }
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
