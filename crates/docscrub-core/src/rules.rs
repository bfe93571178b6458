//! Replacement rules and metadata edits

use crate::error::{Result, ScrubError};
use serde::{Deserialize, Serialize};

/// A literal find-and-replace pair
///
/// `find` is never empty: an empty pattern would match between every
/// character of the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Replacement {
    find: String,
    replace: String,
}

impl Replacement {
    /// Create a rule, rejecting an empty search text
    ///
    /// # Errors
    ///
    /// Returns `InvalidRule` if `find` is empty.
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Result<Self> {
        let find = find.into();
        if find.is_empty() {
            return Err(ScrubError::InvalidRule(
                "search text must not be empty".to_string(),
            ));
        }
        Ok(Self {
            find,
            replace: replace.into(),
        })
    }

    /// Text to search for
    #[inline]
    #[must_use]
    pub fn find(&self) -> &str {
        &self.find
    }

    /// Replacement text
    #[inline]
    #[must_use]
    pub fn replace(&self) -> &str {
        &self.replace
    }

    /// Replace every occurrence of `find` in `text`
    ///
    /// Returns `None` when `find` does not occur.
    #[must_use = "returns the rewritten text"]
    pub fn apply(&self, text: &str) -> Option<String> {
        text.contains(&self.find)
            .then(|| text.replace(&self.find, &self.replace))
    }
}

/// Apply rules in order, each one to the output of the previous one
///
/// Returns the rewritten text and the number of rules that matched. A rule
/// whose search text occurs counts as a hit even if it maps the text to
/// itself.
#[must_use = "returns the rewritten text and hit count"]
pub fn apply_all(text: &str, rules: &[Replacement]) -> (String, usize) {
    let mut current = text.to_string();
    let mut hits = 0;
    for rule in rules {
        if let Some(next) = rule.apply(&current) {
            current = next;
            hits += 1;
        }
    }
    (current, hits)
}

/// Metadata fields to overwrite; `None` leaves a field untouched
///
/// Word documents use `author` and `last_modified_by`; PDFs use `author`,
/// `producer` and `creator`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataEdit {
    pub author: Option<String>,
    pub last_modified_by: Option<String>,
    pub producer: Option<String>,
    pub creator: Option<String>,
}

impl MetadataEdit {
    /// Write the same value into every field
    #[must_use]
    pub fn uniform(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            author: Some(value.clone()),
            last_modified_by: Some(value.clone()),
            producer: Some(value.clone()),
            creator: Some(value),
        }
    }

    /// True when no field would be written
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.last_modified_by.is_none()
            && self.producer.is_none()
            && self.creator.is_none()
    }

    /// True when a Word document would be touched by this edit
    #[inline]
    #[must_use]
    pub const fn touches_word(&self) -> bool {
        self.author.is_some() || self.last_modified_by.is_some()
    }

    /// True when a PDF would be touched by this edit
    #[inline]
    #[must_use]
    pub const fn touches_pdf(&self) -> bool {
        self.author.is_some() || self.producer.is_some() || self.creator.is_some()
    }
}
