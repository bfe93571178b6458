//! In-place batch editing of Word and PDF documents
//!
//! This crate walks a directory tree and applies one operation to every
//! matching document, saving each file in place:
//! - **Metadata**: author and last-modified-by for DOCX; author, producer
//!   and creator for PDF (information dictionary and XMP packet)
//! - **DOC conversion**: legacy `.doc` files are converted to `.docx` by a
//!   headless `LibreOffice` and the converted copy is updated
//! - **Find-and-replace**: literal text rules over DOCX paragraphs, headers
//!   and footers, plus the document title
//!
//! A failing file is journaled and skipped; it never stops the run.
//!
//! ## Dependencies
//!
//! DOC conversion requires `LibreOffice` (`libreoffice` in PATH, or a
//! configured binary).
//!
//! ## Examples
//!
//! ### Replace text in every Word document of a tree
//!
//! ```rust,no_run
//! use docscrub_core::{Journal, JournalPaths, NoopObserver, Operation, Processor, ReplacePlan, Replacement};
//! use std::path::Path;
//!
//! let plan = ReplacePlan {
//!     rules: vec![Replacement::new("Acme Corp", "Initech")?],
//!     ..ReplacePlan::default()
//! };
//! let mut journal = Journal::create(&JournalPaths::in_dir(Path::new(".")))?;
//! let summary = Processor::new(Operation::Replace(plan))
//!     .run(Path::new("contracts"), &mut journal, &mut NoopObserver)?;
//! journal.finish()?;
//! println!("{} modified, {} failed", summary.modified, summary.failed);
//! # Ok::<(), docscrub_core::ScrubError>(())
//! ```
//!
//! ### Read PDF metadata
//!
//! ```rust,no_run
//! use docscrub_core::PdfDocument;
//! use std::path::Path;
//!
//! let info = PdfDocument::open(Path::new("report.pdf"))?.info();
//! println!("Author: {:?}, pages: {}", info.author, info.page_count);
//! # Ok::<(), docscrub_core::ScrubError>(())
//! ```

/// Legacy `.doc` conversion through an office suite
pub mod convert;
/// DOCX package, core properties and paragraph text editing
pub mod docx;
/// Error types
pub mod error;
/// Supported document formats
pub mod format;
/// Run logs
pub mod journal;
/// PDF information dictionary and XMP editing
pub mod pdf;
mod persist;
/// Per-file operations and the batch loop
pub mod processor;
/// Replacement rules and metadata edits
pub mod rules;
/// Directory traversal
pub mod walk;

pub use convert::{OfficeConverter, DEFAULT_OFFICE_BINARY};
pub use docx::{CoreProperties, WordDocument};
pub use error::{Result, ScrubError};
pub use format::DocumentFormat;
pub use journal::{Journal, JournalPaths, DEFAULT_ERROR_LOG, DEFAULT_MODIFIED_LOG};
pub use pdf::{PdfDocument, PdfInfo};
pub use processor::{
    FileReport, FileStatus, MetadataJob, NoopObserver, Operation, Outcome, Processor,
    ReplacePlan, RunObserver, RunSummary,
};
pub use rules::{MetadataEdit, Replacement};
pub use walk::{DocumentEntry, DocumentWalker, WalkOutput};
