//! Plain-text run logs
//!
//! A run keeps two logs: one line per processed file in the modified log,
//! and a two-line entry per failure in the error log.
//!
//! ```text
//! Modified: reports/q1.docx
//! Not modified: reports/q2.docx
//! Converted: old/memo.doc -> old/memo.docx
//!
//! Error with file: broken/scan.pdf
//! Error: PDF error: invalid file header
//! ```

use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default name of the modified-files log
pub const DEFAULT_MODIFIED_LOG: &str = "modified_files_log.txt";
/// Default name of the error log
pub const DEFAULT_ERROR_LOG: &str = "error_files_log.txt";

/// Where the two log files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalPaths {
    pub modified: PathBuf,
    pub errors: PathBuf,
}

impl JournalPaths {
    /// Default file names inside `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::named(dir, DEFAULT_MODIFIED_LOG, DEFAULT_ERROR_LOG)
    }

    /// Custom file names inside `dir`
    #[must_use]
    pub fn named(dir: &Path, modified: &str, errors: &str) -> Self {
        Self {
            modified: dir.join(modified),
            errors: dir.join(errors),
        }
    }
}

/// A journal entry for a file that was processed without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Modified(&'a Path),
    MetadataUpdated(&'a Path),
    NotModified(&'a Path),
    Converted { source: &'a Path, target: &'a Path },
}

/// Writer for the two run logs
#[derive(Debug)]
pub struct Journal<W: Write> {
    modified: W,
    errors: W,
}

impl Journal<BufWriter<File>> {
    /// Create (or truncate) both log files
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be created.
    pub fn create(paths: &JournalPaths) -> Result<Self> {
        let modified = BufWriter::new(File::create(&paths.modified)?);
        let errors = BufWriter::new(File::create(&paths.errors)?);
        Ok(Self { modified, errors })
    }
}

impl<W: Write> Journal<W> {
    /// Journal over arbitrary writers
    pub const fn from_writers(modified: W, errors: W) -> Self {
        Self { modified, errors }
    }

    /// Append a line to the modified log
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn record(&mut self, entry: Entry<'_>) -> Result<()> {
        match entry {
            Entry::Modified(path) => writeln!(self.modified, "Modified: {}", path.display())?,
            Entry::MetadataUpdated(path) => {
                writeln!(self.modified, "Metadata updated: {}", path.display())?;
            }
            Entry::NotModified(path) => {
                writeln!(self.modified, "Not modified: {}", path.display())?;
            }
            Entry::Converted { source, target } => writeln!(
                self.modified,
                "Converted: {} -> {}",
                source.display(),
                target.display()
            )?,
        }
        Ok(())
    }

    /// Append an entry to the error log
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn record_error(&mut self, path: &Path, message: &str) -> Result<()> {
        writeln!(self.errors, "Error with file: {}", path.display())?;
        writeln!(self.errors, "Error: {message}")?;
        Ok(())
    }

    /// Flush both logs and hand back the writers
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<(W, W)> {
        self.modified.flush()?;
        self.errors.flush()?;
        Ok((self.modified, self.errors))
    }
}
