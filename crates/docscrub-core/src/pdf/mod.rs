//! PDF metadata editing with lopdf
//!
//! Two places hold document metadata in a PDF: the document information
//! dictionary referenced from the trailer (`/Info`) and the XMP packet
//! referenced from the catalog (`/Metadata`). Both are updated.

pub mod xmp;

use crate::error::{Result, ScrubError};
use crate::persist::replace_file;
use crate::rules::MetadataEdit;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Metadata read from the information dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
}

/// An open PDF document
#[derive(Debug)]
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
}

impl PdfDocument {
    /// Load a PDF from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, or `Encrypted` if the
    /// document is encrypted.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)?;
        if doc.trailer.has(b"Encrypt") {
            return Err(ScrubError::Encrypted(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Title, author, creator, producer and page count
    #[must_use]
    pub fn info(&self) -> PdfInfo {
        let page_count = self.doc.get_pages().len();
        let Some(dict) = self.info_dict() else {
            return PdfInfo {
                page_count,
                ..PdfInfo::default()
            };
        };

        let text = |key: &[u8]| match dict.get(key) {
            Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
            _ => None,
        };

        PdfInfo {
            title: text(b"Title"),
            author: text(b"Author"),
            creator: text(b"Creator"),
            producer: text(b"Producer"),
            page_count,
        }
    }

    /// Write `/Author`, `/Producer` and `/Creator` into the information
    /// dictionary, creating it if the document has none
    ///
    /// Returns false if `edit` has no PDF field set.
    ///
    /// # Errors
    ///
    /// Returns an error if `/Info` points at something other than a
    /// dictionary.
    pub fn set_info(&mut self, edit: &MetadataEdit) -> Result<bool> {
        if !edit.touches_pdf() {
            return Ok(false);
        }

        let id = self.info_object_id();
        let dict = self.doc.get_object_mut(id)?.as_dict_mut()?;
        for (key, value) in [
            ("Author", &edit.author),
            ("Producer", &edit.producer),
            ("Creator", &edit.creator),
        ] {
            if let Some(value) = value {
                dict.set(key, encode_text(value));
            }
        }
        Ok(true)
    }

    /// The XMP packet, if the catalog references one
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be decoded or is not UTF-8.
    pub fn xmp(&self) -> Result<Option<String>> {
        let Some(id) = self.metadata_stream_id()? else {
            return Ok(None);
        };
        let stream = self.doc.get_object(id)?.as_stream()?;
        Ok(Some(String::from_utf8(stream_content(stream)?)?))
    }

    /// Rewrite the XMP packet with the author, creator and producer of
    /// `edit`, creating a packet if the document has none
    ///
    /// # Errors
    ///
    /// Returns an error if the existing packet cannot be decoded or parsed.
    /// The document is left unchanged in that case.
    pub fn update_xmp(&mut self, edit: &MetadataEdit) -> Result<()> {
        if !edit.touches_pdf() {
            return Ok(());
        }

        if let Some(id) = self.metadata_stream_id()? {
            let stream = self.doc.get_object_mut(id)?.as_stream_mut()?;
            let packet = String::from_utf8(stream_content(stream)?)?;
            let rewritten = xmp::rewrite_packet(&packet, edit)?;
            stream.set_plain_content(rewritten.into_bytes());
            return Ok(());
        }

        let packet = xmp::new_packet(edit)?;
        let stream = Stream::new(
            dictionary! {
                "Type" => "Metadata",
                "Subtype" => "XML",
            },
            packet.into_bytes(),
        );
        let stream_id = self.doc.add_object(stream);
        let root_id = self.root_id()?;
        self.doc
            .get_object_mut(root_id)?
            .as_dict_mut()?
            .set("Metadata", stream_id);
        log::debug!("{}: created XMP metadata stream", self.path.display());
        Ok(())
    }

    /// Write the document back to where it was opened from
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file replacement fails.
    pub fn save(&mut self) -> Result<()> {
        replace_file(&self.path, |file| {
            self.doc.save_to(file)?;
            Ok(())
        })
    }

    fn info_dict(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_object(*id).ok()?.as_dict().ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Id of the information dictionary; a missing or direct dictionary is
    /// turned into an indirect object first
    fn info_object_id(&mut self) -> ObjectId {
        let direct = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => return *id,
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let id = self.doc.add_object(direct);
        self.doc.trailer.set("Info", id);
        id
    }

    fn root_id(&self) -> Result<ObjectId> {
        Ok(self.doc.trailer.get(b"Root")?.as_reference()?)
    }

    fn metadata_stream_id(&self) -> Result<Option<ObjectId>> {
        let catalog = self.doc.get_object(self.root_id()?)?.as_dict()?;
        Ok(catalog
            .get(b"Metadata")
            .ok()
            .and_then(|obj| obj.as_reference().ok()))
    }
}

fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Decode a PDF text string: UTF-16BE with byte order mark, UTF-8, or
/// PDFDocEncoding read as Latin-1
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Encode a text string: ASCII as a literal, anything else as UTF-16BE with
/// byte order mark
#[must_use]
pub fn encode_text(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
