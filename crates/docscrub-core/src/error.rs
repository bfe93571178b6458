//! Error types for document editing operations

use std::io;
use thiserror::Error;

/// Errors that can occur while editing a document or walking a directory tree
#[derive(Error, Debug)]
pub enum ScrubError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error (DOCX container)
    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// PDF object model error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Directory traversal error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Missing required part in a DOCX package
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// The file is not a document of the expected kind
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Encrypted PDFs cannot be edited
    #[error("Encrypted PDF is not supported: {0}")]
    Encrypted(String),

    /// External `.doc` conversion failed
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// A replacement rule cannot be applied
    #[error("Invalid replacement rule: {0}")]
    InvalidRule(String),
}

/// Result type for document editing operations
pub type Result<T> = std::result::Result<T, ScrubError>;

impl From<tempfile::PersistError> for ScrubError {
    #[inline]
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}
