//! Interactive questions on stdin
//!
//! Generic over the reader and writer so the sessions can be driven from
//! tests.

use anyhow::{bail, Result};
use docscrub_core::{MetadataEdit, ReplacePlan, Replacement};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Answers accepted as "yes", compared case-insensitively
const YES: [&str; 4] = ["y", "yes", "o", "oui"];

#[must_use]
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    YES.iter().any(|yes| answer.eq_ignore_ascii_case(yes))
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one trimmed line
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("No answer given (input closed)");
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the answer is not empty
    pub fn ask_non_empty(&mut self, question: &str) -> Result<String> {
        loop {
            let answer = self.ask(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "A value is required.")?;
        }
    }

    /// Ask until the answer is a non-negative number
    pub fn ask_count(&mut self, question: &str) -> Result<usize> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<usize>() {
                Ok(count) => return Ok(count),
                Err(_) => writeln!(self.output, "Please enter a whole number.")?,
            }
        }
    }

    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(is_yes(&self.ask(question)?))
    }

    /// Ask for a directory to process
    pub fn directory(&mut self) -> Result<PathBuf> {
        self.ask_non_empty("Directory to process: ").map(PathBuf::from)
    }

    fn rule(&mut self, find_question: &str, replace_question: &str) -> Result<Replacement> {
        let find = self.ask_non_empty(find_question)?;
        let replace = self.ask(replace_question)?;
        Ok(Replacement::new(find, replace)?)
    }

    /// Metadata value written into every field
    pub fn metadata_edit(&mut self) -> Result<MetadataEdit> {
        let value = self.ask_non_empty("New metadata value: ")?;
        Ok(MetadataEdit::uniform(value))
    }

    /// The full replace session: rules, then title, then authorship
    pub fn replace_plan(&mut self) -> Result<ReplacePlan> {
        let count = self.ask_count("Number of expressions to replace: ")?;
        let mut rules = Vec::with_capacity(count);
        for index in 1..=count {
            rules.push(self.rule(
                &format!("Expression {index} to find: "),
                &format!("Replacement for expression {index}: "),
            )?);
        }

        let title = if self.confirm("Replace text in the document title? (y/n): ")? {
            Some(self.rule("Title text to find: ", "Title replacement: ")?)
        } else {
            None
        };

        let mut authorship = MetadataEdit::default();
        if self.confirm("Change the author and last-modified-by fields? (y/n): ")? {
            authorship.author = Some(self.ask("New author: ")?);
            authorship.last_modified_by = Some(self.ask("New last-modified-by: ")?);
        }

        Ok(ReplacePlan {
            rules,
            title,
            authorship,
        })
    }
}
