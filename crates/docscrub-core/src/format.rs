//! Document format detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Document formats the batch editor knows how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Office Open XML word processing document (.docx)
    Docx,
    /// Microsoft Word 97-2003 binary document (.doc)
    Doc,
    /// Portable Document Format (.pdf)
    Pdf,
}

impl DocumentFormat {
    /// All supported formats
    pub const ALL: [Self; 3] = [Self::Docx, Self::Doc, Self::Pdf];

    /// Detect format from a file extension (case-insensitive, without the dot)
    #[inline]
    #[must_use = "detects format from extension"]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect format from a path's extension
    #[inline]
    #[must_use = "detects format from path"]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension (lowercase, without the dot)
    #[inline]
    #[must_use = "returns the file extension"]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Docx => "DOCX",
            Self::Doc => "DOC",
            Self::Pdf => "PDF",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_extension_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("DOCX"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("Doc"), Some(DocumentFormat::Doc));
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
    }

    #[test]
    fn test_from_extension_unknown() {
        assert_eq!(DocumentFormat::from_extension("odt"), None);
        assert_eq!(DocumentFormat::from_extension("docm"), None);
        assert_eq!(DocumentFormat::from_extension(""), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            DocumentFormat::from_path(&PathBuf::from("/tmp/report.final.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_extension_matches_detection() {
        for format in DocumentFormat::ALL {
            assert_eq!(DocumentFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(DocumentFormat::Docx.to_string(), "DOCX");
        assert_eq!(DocumentFormat::Pdf.to_string(), "PDF");
    }
}
