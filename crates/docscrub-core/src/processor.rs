//! Walk-and-apply loop
//!
//! [`Processor::process`] applies one operation to one file;
//! [`Processor::run`] does it for every matching file under a directory,
//! journals each result and keeps going when a file fails.

use crate::convert::OfficeConverter;
use crate::docx::WordDocument;
use crate::error::{Result, ScrubError};
use crate::format::DocumentFormat;
use crate::journal::{Entry, Journal};
use crate::pdf::PdfDocument;
use crate::rules::{MetadataEdit, Replacement};
use crate::walk::{DocumentWalker, WalkOutput};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rewrite metadata of Word and PDF documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataJob {
    pub edit: MetadataEdit,
    /// Convert `.doc` files to `.docx` and update the converted copy
    pub convert_legacy: bool,
}

/// Find-and-replace in Word documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacePlan {
    /// Applied in order to every paragraph
    pub rules: Vec<Replacement>,
    /// Applied to the document title
    pub title: Option<Replacement>,
    /// Author and last-modified-by to write; other fields are ignored
    pub authorship: MetadataEdit,
}

impl ReplacePlan {
    /// True when the plan cannot change anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.title.is_none() && !self.authorship.touches_word()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Metadata(MetadataJob),
    Replace(ReplacePlan),
}

impl Operation {
    /// Formats this operation applies to
    #[must_use]
    pub fn formats(&self) -> Vec<DocumentFormat> {
        match self {
            Self::Metadata(job) if job.convert_legacy => {
                vec![DocumentFormat::Docx, DocumentFormat::Doc, DocumentFormat::Pdf]
            }
            Self::Metadata(_) => vec![DocumentFormat::Docx, DocumentFormat::Pdf],
            Self::Replace(_) => vec![DocumentFormat::Docx],
        }
    }
}

/// What happened to a file that was processed without error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Text or title changed
    Modified,
    /// Only metadata fields were written
    MetadataUpdated,
    /// Nothing matched; the file was not written
    Unchanged,
    /// A `.doc` file was converted and the new `.docx` updated
    Converted { target: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Done(Outcome),
    Failed(String),
}

/// Result for one file of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// `None` for entries the walk could not read
    pub format: Option<DocumentFormat>,
    pub status: FileStatus,
}

/// Counts for a whole run
///
/// `modified` counts every file that was written, converted ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub converted: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, status: &FileStatus) {
        self.total += 1;
        match status {
            FileStatus::Done(Outcome::Modified | Outcome::MetadataUpdated) => self.modified += 1,
            FileStatus::Done(Outcome::Converted { .. }) => {
                self.modified += 1;
                self.converted += 1;
            }
            FileStatus::Done(Outcome::Unchanged) => self.unchanged += 1,
            FileStatus::Failed(_) => self.failed += 1,
        }
    }

    #[inline]
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Progress callbacks for [`Processor::run`]
pub trait RunObserver {
    /// Called once the file list is known
    fn started(&mut self, _total: usize) {}

    /// Called after each file
    fn file_done(&mut self, report: &FileReport);
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn file_done(&mut self, _report: &FileReport) {}
}

/// Applies an [`Operation`] to files
#[derive(Debug, Clone)]
pub struct Processor {
    operation: Operation,
    converter: OfficeConverter,
}

impl Processor {
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            converter: OfficeConverter::default(),
        }
    }

    /// Use a specific office suite for `.doc` conversion
    #[must_use]
    pub fn with_converter(mut self, converter: OfficeConverter) -> Self {
        self.converter = converter;
        self
    }

    #[inline]
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// List the files a run over `root` would process
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not an existing directory.
    pub fn discover(&self, root: &Path) -> Result<WalkOutput> {
        DocumentWalker::new(root)
            .formats(&self.operation.formats())
            .walk()
    }

    /// Apply the operation to one file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, edited, converted or
    /// saved, or if the operation does not apply to `format`.
    pub fn process(&self, path: &Path, format: DocumentFormat) -> Result<Outcome> {
        log::debug!("Processing {} ({format})", path.display());
        match &self.operation {
            Operation::Metadata(job) => self.process_metadata(job, path, format),
            Operation::Replace(plan) => process_replace(plan, path, format),
        }
    }

    /// Process every matching file under `root`
    ///
    /// Per-file failures are journaled and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not an existing directory or if a
    /// journal write fails.
    pub fn run<W: Write>(
        &self,
        root: &Path,
        journal: &mut Journal<W>,
        observer: &mut dyn RunObserver,
    ) -> Result<RunSummary> {
        let walk = self.discover(root)?;
        observer.started(walk.documents.len() + walk.issues.len());
        let mut summary = RunSummary::default();

        for issue in walk.issues {
            journal.record_error(&issue.path, &issue.message)?;
            let report = FileReport {
                path: issue.path,
                format: None,
                status: FileStatus::Failed(issue.message),
            };
            summary.record(&report.status);
            observer.file_done(&report);
        }

        for entry in walk.documents {
            let status = match self.process(&entry.path, entry.format) {
                Ok(outcome) => {
                    journal.record(journal_entry(&entry.path, &outcome))?;
                    FileStatus::Done(outcome)
                }
                Err(err) => {
                    let message = err.to_string();
                    log::debug!("Error with file {}: {message}", entry.path.display());
                    journal.record_error(&entry.path, &message)?;
                    FileStatus::Failed(message)
                }
            };
            summary.record(&status);
            observer.file_done(&FileReport {
                path: entry.path,
                format: Some(entry.format),
                status,
            });
        }

        log::info!(
            "Processed {} file(s): {} modified, {} unchanged, {} failed",
            summary.total,
            summary.modified,
            summary.unchanged,
            summary.failed
        );
        Ok(summary)
    }

    fn process_metadata(
        &self,
        job: &MetadataJob,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<Outcome> {
        match format {
            DocumentFormat::Docx => update_word_metadata(&job.edit, path),
            DocumentFormat::Doc => {
                if !job.convert_legacy {
                    return Err(ScrubError::InvalidDocument(
                        ".doc conversion is disabled".to_string(),
                    ));
                }
                let target = self.converter.convert_to_docx(path)?;
                update_word_metadata(&job.edit, &target)?;
                Ok(Outcome::Converted { target })
            }
            DocumentFormat::Pdf => update_pdf_metadata(&job.edit, path),
        }
    }
}

fn update_word_metadata(edit: &MetadataEdit, path: &Path) -> Result<Outcome> {
    if !edit.touches_word() {
        return Ok(Outcome::Unchanged);
    }
    let mut doc = WordDocument::open(path)?;
    doc.set_authorship(edit.author.as_deref(), edit.last_modified_by.as_deref())?;
    doc.save()?;
    log::info!("Metadata updated: {}", path.display());
    Ok(Outcome::MetadataUpdated)
}

fn update_pdf_metadata(edit: &MetadataEdit, path: &Path) -> Result<Outcome> {
    let mut pdf = PdfDocument::open(path)?;
    if !pdf.set_info(edit)? {
        return Ok(Outcome::Unchanged);
    }
    if let Err(e) = pdf.update_xmp(edit) {
        log::warn!("{}: XMP metadata not updated: {e}", path.display());
    }
    pdf.save()?;
    log::info!("Metadata updated: {}", path.display());
    Ok(Outcome::MetadataUpdated)
}

fn process_replace(plan: &ReplacePlan, path: &Path, format: DocumentFormat) -> Result<Outcome> {
    if format != DocumentFormat::Docx {
        return Err(ScrubError::InvalidDocument(format!(
            "text replacement is not supported for {format} files"
        )));
    }

    let mut doc = WordDocument::open(path)?;
    let paragraphs = doc.replace_text(&plan.rules)?;
    let title_changed = match &plan.title {
        Some(rule) => doc.replace_title(rule)?,
        None => false,
    };
    let authorship = plan.authorship.touches_word();
    if authorship {
        doc.set_authorship(
            plan.authorship.author.as_deref(),
            plan.authorship.last_modified_by.as_deref(),
        )?;
    }

    if paragraphs == 0 && !title_changed && !authorship {
        log::debug!("Not modified: {}", path.display());
        return Ok(Outcome::Unchanged);
    }

    doc.save()?;
    if paragraphs > 0 || title_changed {
        log::info!(
            "Modified: {} ({paragraphs} paragraph(s){})",
            path.display(),
            if title_changed { ", title" } else { "" }
        );
        Ok(Outcome::Modified)
    } else {
        log::info!("Metadata updated: {}", path.display());
        Ok(Outcome::MetadataUpdated)
    }
}

fn journal_entry<'a>(path: &'a Path, outcome: &'a Outcome) -> Entry<'a> {
    match outcome {
        Outcome::Modified => Entry::Modified(path),
        Outcome::MetadataUpdated => Entry::MetadataUpdated(path),
        Outcome::Unchanged => Entry::NotModified(path),
        Outcome::Converted { target } => Entry::Converted {
            source: path,
            target,
        },
    }
}
