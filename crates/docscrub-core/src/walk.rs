//! Directory traversal
//!
//! Collects every candidate document under a root before anything is
//! processed, so files created during a run (converted `.docx`) are not
//! picked up a second time.

use crate::error::{Result, ScrubError};
use crate::format::DocumentFormat;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A document found during traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentEntry {
    pub path: PathBuf,
    pub format: DocumentFormat,
}

/// A path that could not be read during traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalkIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Traversal result: documents in file-name order plus unreadable paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutput {
    pub documents: Vec<DocumentEntry>,
    pub issues: Vec<WalkIssue>,
}

/// Recursive document finder
#[derive(Debug, Clone)]
pub struct DocumentWalker {
    root: PathBuf,
    formats: Vec<DocumentFormat>,
}

impl DocumentWalker {
    /// Walker over `root` accepting every supported format
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            formats: DocumentFormat::ALL.to_vec(),
        }
    }

    /// Restrict the walk to the given formats
    #[must_use]
    pub fn formats(mut self, formats: &[DocumentFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    /// Root directory of the walk
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if the root is not an existing directory.
    /// Unreadable entries below the root are reported in
    /// [`WalkOutput::issues`] instead.
    pub fn walk(&self) -> Result<WalkOutput> {
        if !self.root.is_dir() {
            return Err(ScrubError::InvalidDocument(format!(
                "not a valid directory: {}",
                self.root.display()
            )));
        }

        let mut output = WalkOutput::default();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Cannot read {}: {e}", path.display());
                    output.issues.push(WalkIssue {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            // Symlinked documents are edited through their target
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            if is_temporary(entry.file_name().to_string_lossy().as_ref()) {
                log::debug!("Skipping temporary file {}", entry.path().display());
                continue;
            }
            let Some(format) = DocumentFormat::from_path(entry.path()) else {
                continue;
            };
            if self.formats.contains(&format) {
                output.documents.push(DocumentEntry {
                    path: entry.into_path(),
                    format,
                });
            }
        }

        log::debug!(
            "Found {} documents under {}",
            output.documents.len(),
            self.root.display()
        );
        Ok(output)
    }
}

/// Office lock and temporary files (`~$report.docx`, `~WRL0001.tmp`)
#[inline]
fn is_temporary(file_name: &str) -> bool {
    file_name.starts_with('~')
}
