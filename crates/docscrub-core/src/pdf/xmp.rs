//! XMP packet rewriting
//!
//! Only three properties are touched: `dc:creator` (author),
//! `xmp:CreatorTool` (creator) and `pdf:Producer` (producer). Everything
//! else in the packet, including the `xpacket` processing instructions and
//! padding, is copied through.

use crate::error::{Result, ScrubError};
use crate::rules::MetadataEdit;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const DESCRIPTION: &[u8] = b"rdf:Description";
const RDF: &[u8] = b"rdf:RDF";

const EMPTY_PACKET: &str = concat!(
    "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n",
    "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">",
    "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
    "</rdf:RDF>",
    "</x:xmpmeta>\n",
    "<?xpacket end=\"w\"?>",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Property {
    Creator,
    CreatorTool,
    Producer,
}

impl Property {
    const ALL: [Self; 3] = [Self::Creator, Self::CreatorTool, Self::Producer];

    const fn index(self) -> usize {
        match self {
            Self::Creator => 0,
            Self::CreatorTool => 1,
            Self::Producer => 2,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Creator => "dc:creator",
            Self::CreatorTool => "xmp:CreatorTool",
            Self::Producer => "pdf:Producer",
        }
    }

    const fn namespace(self) -> (&'static str, &'static str) {
        match self {
            Self::Creator => ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            Self::CreatorTool => ("xmlns:xmp", "http://ns.adobe.com/xap/1.0/"),
            Self::Producer => ("xmlns:pdf", "http://ns.adobe.com/pdf/1.3/"),
        }
    }

    fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name().as_bytes() == name)
    }

    fn value(self, edit: &MetadataEdit) -> Option<&str> {
        match self {
            Self::Creator => edit.author.as_deref(),
            Self::CreatorTool => edit.creator.as_deref(),
            Self::Producer => edit.producer.as_deref(),
        }
    }
}

/// Write the content of a property element: an ordered array for
/// `dc:creator`, plain text otherwise
fn write_value(writer: &mut Writer<Vec<u8>>, property: Property, value: &str) -> Result<()> {
    if property == Property::Creator {
        writer.write_event(Event::Start(BytesStart::new("rdf:Seq")))?;
        writer.write_event(Event::Start(BytesStart::new("rdf:li")))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:Seq")))?;
    } else {
        writer.write_event(Event::Text(BytesText::new(value)))?;
    }
    Ok(())
}

/// Rebuild an `rdf:Description` tag with edited property attributes
fn rewrite_description(
    start: &BytesStart<'_>,
    edit: &MetadataEdit,
    seen: &mut [bool; 3],
) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in start.attributes().with_checks(false).flatten() {
        let edited = Property::from_name(attr.key.as_ref())
            .and_then(|p| p.value(edit).map(|v| (p, v)));
        match edited {
            // dc:creator is an array and cannot live in an attribute; it is
            // dropped here and written as an element instead
            Some((Property::Creator, _)) => {}
            Some((property, value)) => {
                seen[property.index()] = true;
                out.push_attribute((property.name(), value));
            }
            None => out.push_attribute(attr),
        }
    }
    out
}

fn write_missing(
    writer: &mut Writer<Vec<u8>>,
    edit: &MetadataEdit,
    seen: &[bool; 3],
) -> Result<()> {
    let missing: Vec<(Property, &str)> = Property::ALL
        .into_iter()
        .filter(|p| !seen[p.index()])
        .filter_map(|p| p.value(edit).map(|v| (p, v)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut description = BytesStart::new("rdf:Description");
    description.push_attribute(("rdf:about", ""));
    for (property, _) in &missing {
        description.push_attribute(property.namespace());
    }
    writer.write_event(Event::Start(description))?;
    for (property, value) in missing {
        writer.write_event(Event::Start(BytesStart::new(property.name())))?;
        write_value(writer, property, value)?;
        writer.write_event(Event::End(BytesEnd::new(property.name())))?;
    }
    writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
    Ok(())
}

/// Rewrite an XMP packet with the author, creator and producer of `edit`
///
/// Fields of `edit` that are `None` are left as they are.
///
/// # Errors
///
/// Returns an error if the packet is not well-formed XML or has no
/// `rdf:RDF` element.
pub fn rewrite_packet(xml: &str, edit: &MetadataEdit) -> Result<String> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let mut seen = [false; 3];
    let mut skipping: Option<usize> = None;
    let mut found_rdf = false;

    loop {
        let event = reader.read_event()?;

        if let Some(depth) = skipping.as_mut() {
            match &event {
                Event::Start(_) => *depth += 1,
                Event::End(_) if *depth == 0 => {
                    skipping = None;
                    writer.write_event(&event)?;
                }
                Event::End(_) => *depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        let edited = match &event {
            Event::Start(e) | Event::Empty(e) => {
                Property::from_name(e.name().as_ref()).and_then(|p| p.value(edit).map(|v| (p, v)))
            }
            _ => None,
        };

        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == DESCRIPTION => {
                writer.write_event(Event::Start(rewrite_description(e, edit, &mut seen)))?;
            }
            Event::Empty(e) if e.name().as_ref() == DESCRIPTION => {
                writer.write_event(Event::Empty(rewrite_description(e, edit, &mut seen)))?;
            }
            Event::Start(_) if edited.is_some() => {
                if let Some((property, value)) = edited {
                    seen[property.index()] = true;
                    writer.write_event(&event)?;
                    write_value(&mut writer, property, value)?;
                    skipping = Some(0);
                }
            }
            Event::Empty(e) if edited.is_some() => {
                if let Some((property, value)) = edited {
                    seen[property.index()] = true;
                    writer.write_event(Event::Start(e.clone()))?;
                    write_value(&mut writer, property, value)?;
                    writer.write_event(Event::End(e.to_end()))?;
                }
            }
            Event::End(e) if e.name().as_ref() == RDF => {
                write_missing(&mut writer, edit, &seen)?;
                writer.write_event(&event)?;
                found_rdf = true;
            }
            _ => writer.write_event(&event)?,
        }
    }

    if !found_rdf {
        return Err(ScrubError::InvalidDocument(
            "XMP packet has no rdf:RDF element".to_string(),
        ));
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Build a new XMP packet holding the author, creator and producer of `edit`
///
/// # Errors
///
/// Returns an error only if the generated packet cannot be serialized.
pub fn new_packet(edit: &MetadataEdit) -> Result<String> {
    rewrite_packet(EMPTY_PACKET, edit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = concat!(
        "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n",
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n",
        " <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n",
        "  <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n",
        "   <dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">Report</rdf:li></rdf:Alt></dc:title>\n",
        "   <dc:creator><rdf:Bag><rdf:li>Alice</rdf:li><rdf:li>Bob</rdf:li></rdf:Bag></dc:creator>\n",
        "  </rdf:Description>\n",
        "  <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\n",
        "   <xmp:CreatorTool>Writer</xmp:CreatorTool>\n",
        "  </rdf:Description>\n",
        " </rdf:RDF>\n",
        "</x:xmpmeta>\n",
        "<?xpacket end=\"w\"?>",
    );

    fn edit(author: &str, creator: &str, producer: &str) -> MetadataEdit {
        MetadataEdit {
            author: Some(author.to_string()),
            last_modified_by: None,
            producer: Some(producer.to_string()),
            creator: Some(creator.to_string()),
        }
    }

    #[test]
    fn test_rewrites_elements_and_adds_missing() {
        let out = rewrite_packet(PACKET, &edit("Legal", "Scrub", "Scrub PDF")).unwrap();

        assert!(out.contains("<dc:creator><rdf:Seq><rdf:li>Legal</rdf:li></rdf:Seq></dc:creator>"));
        assert!(!out.contains("Alice"));
        assert!(out.contains("<xmp:CreatorTool>Scrub</xmp:CreatorTool>"));
        assert!(out.contains("<pdf:Producer>Scrub PDF</pdf:Producer>"));
        assert!(out.contains(r#"xmlns:pdf="http://ns.adobe.com/pdf/1.3/""#));
        // Only the missing property gets a new description
        assert_eq!(out.matches("<rdf:Description").count(), 3);
        assert!(out.contains("Report"));
        assert!(out.starts_with("<?xpacket begin="));
        assert!(out.ends_with("<?xpacket end=\"w\"?>"));
    }

    #[test]
    fn test_rewrites_attribute_form() {
        let xml = concat!(
            "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
            "<rdf:Description rdf:about=\"\" xmlns:pdf=\"http://ns.adobe.com/pdf/1.3/\" pdf:Producer=\"Old &amp; Co\"/>",
            "</rdf:RDF></x:xmpmeta>",
        );
        let only_producer = MetadataEdit {
            producer: Some("New <Tool>".to_string()),
            ..MetadataEdit::default()
        };
        let out = rewrite_packet(xml, &only_producer).unwrap();

        assert!(out.contains(r#"pdf:Producer="New &lt;Tool&gt;""#));
        assert!(!out.contains("Old"));
        assert_eq!(out.matches("<rdf:Description").count(), 1);
    }

    #[test]
    fn test_empty_property_element_is_expanded() {
        let xml = concat!(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
            "<rdf:Description rdf:about=\"\"><xmp:CreatorTool/></rdf:Description>",
            "</rdf:RDF>",
        );
        let only_creator = MetadataEdit {
            creator: Some("Scrub".to_string()),
            ..MetadataEdit::default()
        };
        let out = rewrite_packet(xml, &only_creator).unwrap();
        assert!(out.contains("<xmp:CreatorTool>Scrub</xmp:CreatorTool>"));
    }

    #[test]
    fn test_untouched_fields_are_kept() {
        let only_producer = MetadataEdit {
            producer: Some("P".to_string()),
            ..MetadataEdit::default()
        };
        let out = rewrite_packet(PACKET, &only_producer).unwrap();
        assert!(out.contains("<rdf:li>Alice</rdf:li><rdf:li>Bob</rdf:li>"));
        assert!(out.contains("<xmp:CreatorTool>Writer</xmp:CreatorTool>"));
    }

    #[test]
    fn test_new_packet() {
        let out = new_packet(&edit("A", "C", "P")).unwrap();
        assert!(out.contains("<rdf:li>A</rdf:li>"));
        assert!(out.contains("<xmp:CreatorTool>C</xmp:CreatorTool>"));
        assert!(out.contains("<pdf:Producer>P</pdf:Producer>"));
        assert!(out.contains(r#"xmlns:dc="http://purl.org/dc/elements/1.1/""#));
    }

    #[test]
    fn test_packet_without_rdf_is_rejected() {
        let err = rewrite_packet("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>", &edit("A", "C", "P"))
            .unwrap_err();
        assert!(err.to_string().contains("rdf:RDF"));
    }
}
