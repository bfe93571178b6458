//! In-memory DOCX (OPC/ZIP) package
//!
//! The whole archive is read into memory so individual parts can be
//! rewritten and the package saved back over the original file. Entry
//! order and per-entry compression are kept.

use crate::error::{Result, ScrubError};
use crate::persist::replace_file;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part, required in every Word package
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Core properties part
pub const CORE_PART: &str = "docProps/core.xml";
/// Content types part
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Package relationships part
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// A Word package held in memory
#[derive(Debug, Clone)]
pub struct DocxPackage {
    path: PathBuf,
    parts: Vec<Part>,
}

impl DocxPackage {
    /// Read a package from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a ZIP archive, or
    /// has no `word/document.xml`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut package = Self::read_from(file)?;
        package.path = path.to_path_buf();
        Ok(package)
    }

    /// Read a package from any seekable reader
    ///
    /// The returned package has no backing path; use [`DocxPackage::save_as`].
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a ZIP archive or has no
    /// `word/document.xml`.
    pub fn read_from<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let mut data = Vec::new();
            if !entry.is_dir() {
                entry.read_to_end(&mut data)?;
            }
            parts.push(Part {
                name: entry.name().to_string(),
                data,
                compression: entry.compression(),
                is_dir: entry.is_dir(),
            });
        }

        let package = Self {
            path: PathBuf::new(),
            parts,
        };
        if !package.has_part(DOCUMENT_PART) {
            return Err(ScrubError::InvalidDocument(format!(
                "not a Word document (missing {DOCUMENT_PART})"
            )));
        }
        Ok(package)
    }

    /// Path the package was opened from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all file parts, in archive order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter(|p| !p.is_dir)
            .map(|p| p.name.as_str())
    }

    /// True if a file part with this name exists
    #[inline]
    #[must_use]
    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| !p.is_dir && p.name == name)
    }

    /// Raw bytes of a part
    #[must_use]
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| !p.is_dir && p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// A part decoded as UTF-8 text
    ///
    /// # Errors
    ///
    /// Returns `MissingPart` if the part does not exist, or `Utf8` if it is
    /// not valid UTF-8.
    pub fn part_string(&self, name: &str) -> Result<String> {
        let bytes = self
            .part(name)
            .ok_or_else(|| ScrubError::MissingPart(name.to_string()))?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Replace a part's content, or append a new deflated part
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        if let Some(part) = self.parts.iter_mut().find(|p| !p.is_dir && p.name == name) {
            part.data = data;
        } else {
            self.parts.push(Part {
                name: name.to_string(),
                data,
                compression: CompressionMethod::Deflated,
                is_dir: false,
            });
        }
    }

    /// Write the package back over the file it was opened from
    ///
    /// # Errors
    ///
    /// Returns an error if the package has no backing path or writing fails.
    pub fn save(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ScrubError::InvalidDocument(
                "package has no backing file".to_string(),
            ));
        }
        self.save_as(&self.path)
    }

    /// Write the package to `dest`
    ///
    /// The archive is written to a temporary file next to `dest` and then
    /// renamed over it, so `dest` is never left half-written.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created, written or
    /// renamed.
    pub fn save_as(&self, dest: &Path) -> Result<()> {
        replace_file(dest, |file| {
            self.write_to(file)?;
            Ok(())
        })
    }

    /// Serialize the package as a ZIP archive into `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);

        for part in &self.parts {
            let method = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options: FileOptions<()> = FileOptions::default().compression_method(method);
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)?;
            } else {
                zip.start_file(part.name.as_str(), options)?;
                zip.write_all(&part.data)?;
            }
        }

        Ok(zip.finish()?)
    }
}
