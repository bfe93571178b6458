//! Paragraph-level find-and-replace in WordprocessingML parts
//!
//! Word splits a paragraph's text over runs (`w:r`), each with its own text
//! node (`w:t`), so a phrase can straddle several runs. Replacement works on
//! the paragraph text (the concatenation of its runs). When every match lies
//! inside a single run the runs are edited in place and keep their
//! formatting; otherwise the new paragraph text goes into the first run and
//! the remaining runs are emptied.

use crate::error::Result;
use crate::rules::{apply_all, Replacement};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// True for parts holding paragraph text: the main document, headers and footers
#[must_use]
pub fn is_text_part(name: &str) -> bool {
    if name == "word/document.xml" {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && (file.starts_with("header") || file.starts_with("footer"))
        && file.ends_with(".xml")
}

#[derive(Debug)]
struct TextRun {
    /// Index of the `w:t` start event
    start: usize,
    /// Indices of the text events inside it
    texts: Vec<usize>,
    value: String,
}

/// Events of one open paragraph; nested paragraphs are folded in as plain
/// events once they close
#[derive(Debug)]
struct ParagraphFrame<'a> {
    events: Vec<Event<'a>>,
    runs: Vec<TextRun>,
    in_text: bool,
}

impl<'a> ParagraphFrame<'a> {
    fn new(start: Event<'a>) -> Self {
        Self {
            events: vec![start],
            runs: Vec::new(),
            in_text: false,
        }
    }

    fn push(&mut self, event: Event<'a>) -> Result<()> {
        let index = self.events.len();
        match &event {
            Event::Start(e) if e.name().as_ref() == TEXT => {
                self.runs.push(TextRun {
                    start: index,
                    texts: Vec::new(),
                    value: String::new(),
                });
                self.in_text = true;
            }
            Event::End(e) if e.name().as_ref() == TEXT => self.in_text = false,
            Event::Text(t) if self.in_text => {
                if let Some(run) = self.runs.last_mut() {
                    run.texts.push(index);
                    run.value.push_str(&t.unescape()?);
                }
            }
            _ => {}
        }
        self.events.push(event);
        Ok(())
    }

    /// Apply the rules to this paragraph; returns true if any rule matched
    fn apply(&mut self, rules: &[Replacement]) -> bool {
        let original: String = self.runs.iter().map(|r| r.value.as_str()).collect();
        let (updated, hits) = apply_all(&original, rules);
        if hits == 0 {
            return false;
        }

        let per_run: Vec<String> = self
            .runs
            .iter()
            .map(|r| apply_all(&r.value, rules).0)
            .collect();

        if per_run.concat() == updated {
            for (index, value) in per_run.iter().enumerate() {
                if *value != self.runs[index].value {
                    self.write_run(index, value);
                }
            }
        } else {
            let mut target = Some(updated);
            for index in 0..self.runs.len() {
                if self.runs[index].texts.is_empty() {
                    continue;
                }
                let value = target.take().unwrap_or_default();
                self.write_run(index, &value);
            }
        }
        true
    }

    fn write_run(&mut self, index: usize, value: &str) {
        let start = self.runs[index].start;
        let texts = self.runs[index].texts.clone();
        let Some((first, rest)) = texts.split_first() else {
            return;
        };

        self.events[*first] = Event::Text(BytesText::new(value).into_owned());
        for &other in rest {
            self.events[other] = Event::Text(BytesText::new(""));
        }
        let preserved = match &self.events[start] {
            Event::Start(e) => Some(preserve_space(e)),
            _ => None,
        };
        if let Some(tag) = preserved {
            self.events[start] = Event::Start(tag);
        }
        self.runs[index].value = value.to_string();
    }
}

/// Copy of a `w:t` start tag carrying `xml:space="preserve"`
fn preserve_space(start: &BytesStart<'_>) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in start.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() != b"xml:space" {
            out.push_attribute(attr);
        }
    }
    out.push_attribute(("xml:space", "preserve"));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Open,
    Close,
    Eof,
    Other,
}

fn boundary(event: &Event<'_>) -> Boundary {
    match event {
        Event::Start(e) if e.name().as_ref() == PARAGRAPH => Boundary::Open,
        Event::End(e) if e.name().as_ref() == PARAGRAPH => Boundary::Close,
        Event::Eof => Boundary::Eof,
        _ => Boundary::Other,
    }
}

/// Replace text in every paragraph of a WordprocessingML part
///
/// Returns the rewritten XML and the number of paragraphs in which at least
/// one rule matched.
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn replace_in_xml(xml: &str, rules: &[Replacement]) -> Result<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    // xml:space="preserve" runs depend on exact whitespace
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<ParagraphFrame<'_>> = Vec::new();
    let mut changed = 0;

    loop {
        let event = reader.read_event()?;
        match boundary(&event) {
            Boundary::Eof => break,
            Boundary::Open => {
                stack.push(ParagraphFrame::new(event));
                continue;
            }
            Boundary::Close => {
                if let Some(mut frame) = stack.pop() {
                    frame.events.push(event);
                    if frame.apply(rules) {
                        changed += 1;
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.events.extend(frame.events),
                        None => {
                            for e in &frame.events {
                                writer.write_event(e)?;
                            }
                        }
                    }
                    continue;
                }
            }
            Boundary::Other => {}
        }

        match stack.last_mut() {
            Some(frame) => frame.push(event)?,
            None => writer.write_event(&event)?,
        }
    }

    // Unbalanced input: flush whatever is still open, untouched
    for frame in stack {
        for e in &frame.events {
            writer.write_event(e)?;
        }
    }

    Ok((String::from_utf8(writer.into_inner())?, changed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;
    const TAIL: &str = "</w:body></w:document>";

    fn doc(body: &str) -> String {
        format!("{HEAD}{body}{TAIL}")
    }

    fn rule(find: &str, replace: &str) -> Replacement {
        Replacement::new(find, replace).unwrap()
    }

    #[test]
    fn test_is_text_part() {
        assert!(is_text_part("word/document.xml"));
        assert!(is_text_part("word/header1.xml"));
        assert!(is_text_part("word/footer2.xml"));
        assert!(!is_text_part("word/styles.xml"));
        assert!(!is_text_part("word/_rels/header1.xml.rels"));
        assert!(!is_text_part("word/theme/header1.xml"));
        assert!(!is_text_part("docProps/core.xml"));
    }

    #[test]
    fn test_replace_within_single_run_keeps_formatting() {
        let xml = doc(r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello Acme</w:t></w:r><w:r><w:t xml:space="preserve"> and friends</w:t></w:r></w:p>"#);
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "Initech")]).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(
            out,
            doc(r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Hello Initech</w:t></w:r><w:r><w:t xml:space="preserve"> and friends</w:t></w:r></w:p>"#)
        );
    }

    #[test]
    fn test_replace_across_runs_collapses_into_first_run() {
        let xml = doc(r"<w:p><w:r><w:t>Ac</w:t></w:r><w:r><w:t>me Corp</w:t></w:r></w:p>");
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "Initech")]).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(
            out,
            doc(r#"<w:p><w:r><w:t xml:space="preserve">Initech Corp</w:t></w:r><w:r><w:t xml:space="preserve"></w:t></w:r></w:p>"#)
        );
    }

    #[test]
    fn test_no_match_leaves_xml_untouched() {
        let xml = doc(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>Nothing</w:t></w:r></w:p>"#);
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "Initech")]).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(out, xml);
    }

    #[test]
    fn test_counts_paragraphs_including_tables() {
        let xml = doc(concat!(
            r"<w:p><w:r><w:t>Acme one</w:t></w:r></w:p>",
            r"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Acme cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            r"<w:p><w:r><w:t>other</w:t></w:r></w:p>",
        ));
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "Initech")]).unwrap();
        assert_eq!(changed, 2);
        assert!(out.contains("Initech cell"));
        assert!(!out.contains("Acme"));
    }

    #[test]
    fn test_escaping_round_trip() {
        let xml = doc(r"<w:p><w:r><w:t>R&amp;D at Acme</w:t></w:r></w:p>");
        let (out, _) = replace_in_xml(&xml, &[rule("R&D", "<Research>")]).unwrap();
        assert!(out.contains("&lt;Research&gt; at Acme"));
    }

    #[test]
    fn test_rules_chain_in_order() {
        let xml = doc(r"<w:p><w:r><w:t>red</w:t></w:r></w:p>");
        let (out, changed) =
            replace_in_xml(&xml, &[rule("red", "green"), rule("green", "blue")]).unwrap();
        assert_eq!(changed, 1);
        assert!(out.contains(">blue<"));
    }

    #[test]
    fn test_nested_paragraph_handled_separately() {
        // Text box paragraph inside a run of the outer paragraph
        let xml = doc(concat!(
            r"<w:p><w:r><w:t>outer Acme</w:t></w:r>",
            r"<w:r><w:txbxContent><w:p><w:r><w:t>inner Acme</w:t></w:r></w:p></w:txbxContent></w:r>",
            r"</w:p>",
        ));
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "X")]).unwrap();
        assert_eq!(changed, 2);
        assert!(out.contains(">outer X<"));
        assert!(out.contains(">inner X<"));
    }

    #[test]
    fn test_deleted_text_is_ignored() {
        let xml = doc(r"<w:p><w:del><w:r><w:delText>Acme</w:delText></w:r></w:del><w:r><w:t>kept</w:t></w:r></w:p>");
        let (out, changed) = replace_in_xml(&xml, &[rule("Acme", "X")]).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(out, xml);
    }
}
