//! DOCX (Microsoft Word) editing
//!
//! Manual ZIP + XML handling: the package is read into memory, the affected
//! XML parts are rewritten event by event with quick-xml, and the archive is
//! written back over the original.
//!
//! - `word/document.xml`, `word/header*.xml`, `word/footer*.xml`: paragraph text
//! - `docProps/core.xml`: title, author, last-modified-by

pub mod core_props;
pub mod package;
pub mod text;

pub use core_props::{CoreEdits, CoreProperties};
pub use package::DocxPackage;

use crate::error::{Result, ScrubError};
use crate::rules::Replacement;
use package::{CONTENT_TYPES_PART, CORE_PART, PACKAGE_RELS_PART};
use std::path::Path;

const CORE_CONTENT_TYPE: &str = r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#;
const CORE_RELATIONSHIP: &str = r#"<Relationship Id="rIdDocscrubCore" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#;

/// An open Word document
#[derive(Debug, Clone)]
pub struct WordDocument {
    package: DocxPackage,
}

impl WordDocument {
    /// Open a `.docx` file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a readable Word package.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            package: DocxPackage::open(path)?,
        })
    }

    /// Wrap an already loaded package
    #[must_use]
    pub const fn from_package(package: DocxPackage) -> Self {
        Self { package }
    }

    /// Path the document was opened from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.package.path()
    }

    /// Underlying package
    #[inline]
    #[must_use]
    pub const fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Read the core properties; a package without a core part has none set
    ///
    /// # Errors
    ///
    /// Returns an error if the core part is not valid XML.
    pub fn core_properties(&self) -> Result<CoreProperties> {
        match self.core_xml()? {
            Some(xml) => CoreProperties::from_xml(&xml),
            None => Ok(CoreProperties::default()),
        }
    }

    /// Replace text in the body, headers and footers
    ///
    /// Returns the number of paragraphs where a rule matched.
    ///
    /// # Errors
    ///
    /// Returns an error if a text part is not valid XML.
    pub fn replace_text(&mut self, rules: &[Replacement]) -> Result<usize> {
        if rules.is_empty() {
            return Ok(0);
        }

        let names: Vec<String> = self
            .package
            .part_names()
            .filter(|name| text::is_text_part(name))
            .map(str::to_string)
            .collect();

        let mut total = 0;
        for name in names {
            let xml = self.xml_part(&name)?;
            let (rewritten, changed) = text::replace_in_xml(&xml, rules)?;
            if changed > 0 {
                log::debug!("{name}: {changed} paragraph(s) changed");
                self.package.set_part(&name, rewritten.into_bytes());
                total += changed;
            }
        }
        Ok(total)
    }

    /// Replace text in the document title, if there is one
    ///
    /// # Errors
    ///
    /// Returns an error if the core part is not valid XML.
    pub fn replace_title(&mut self, rule: &Replacement) -> Result<bool> {
        let Some(xml) = self.core_xml()? else {
            return Ok(false);
        };
        let edits = CoreEdits {
            title: Some(rule),
            ..CoreEdits::default()
        };
        let rewrite = core_props::rewrite(&xml, &edits)?;
        if rewrite.title_changed {
            self.package.set_part(CORE_PART, rewrite.xml.into_bytes());
        }
        Ok(rewrite.title_changed)
    }

    /// Set the author (`dc:creator`) and last-modified-by fields
    ///
    /// A missing core properties part is created and registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the core part is not valid XML, or if a core part
    /// has to be created and the package lacks `[Content_Types].xml` or
    /// `_rels/.rels`.
    pub fn set_authorship(
        &mut self,
        author: Option<&str>,
        last_modified_by: Option<&str>,
    ) -> Result<()> {
        if author.is_none() && last_modified_by.is_none() {
            return Ok(());
        }

        let xml = if let Some(xml) = self.core_xml()? {
            xml
        } else {
            self.register_core_part()?;
            core_props::EMPTY_CORE_XML.to_string()
        };

        let edits = CoreEdits {
            author,
            last_modified_by,
            title: None,
        };
        let rewrite = core_props::rewrite(&xml, &edits)?;
        self.package.set_part(CORE_PART, rewrite.xml.into_bytes());
        Ok(())
    }

    /// Write the document back to where it was opened from
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn save(&self) -> Result<()> {
        self.package.save()
    }

    fn core_xml(&self) -> Result<Option<String>> {
        if self.package.has_part(CORE_PART) {
            self.xml_part(CORE_PART).map(Some)
        } else {
            Ok(None)
        }
    }

    fn xml_part(&self, name: &str) -> Result<String> {
        let text = self.package.part_string(name)?;
        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    fn register_core_part(&mut self) -> Result<()> {
        let types = self.xml_part(CONTENT_TYPES_PART)?;
        if !types.contains("/docProps/core.xml") {
            let patched = insert_before(&types, "</Types>", CORE_CONTENT_TYPE)?;
            self.package.set_part(CONTENT_TYPES_PART, patched.into_bytes());
        }

        let rels = self.xml_part(PACKAGE_RELS_PART)?;
        if !rels.contains("docProps/core.xml") {
            let patched = insert_before(&rels, "</Relationships>", CORE_RELATIONSHIP)?;
            self.package.set_part(PACKAGE_RELS_PART, patched.into_bytes());
        }
        Ok(())
    }
}

fn insert_before(xml: &str, closing: &str, fragment: &str) -> Result<String> {
    let pos = xml.rfind(closing).ok_or_else(|| {
        ScrubError::InvalidDocument(format!("malformed package part: {closing} not found"))
    })?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..pos]);
    out.push_str(fragment);
    out.push_str(&xml[pos..]);
    Ok(out)
}
