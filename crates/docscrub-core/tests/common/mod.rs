//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#,
);

pub const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#,
);

/// `docProps/core.xml` with the given title and author
pub fn core_xml(title: &str, author: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{}</dc:title><dc:creator>{}</dc:creator>",
            "<cp:lastModifiedBy>{}</cp:lastModifiedBy>",
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2023-05-01T10:00:00Z</dcterms:modified>"#,
            "</cp:coreProperties>",
        ),
        title, author, author
    )
}

/// `word/document.xml` with one single-run paragraph per entry
pub fn document_xml(paragraphs: &[&str]) -> String {
    let mut body = String::new();
    for text in paragraphs {
        body.push_str(&format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"));
    }
    format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

/// Write a small Word package; `core` is the core properties part, if any
pub fn write_docx(path: &Path, paragraphs: &[&str], core: Option<&str>) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<()> = FileOptions::default();

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(PACKAGE_RELS.as_bytes()).unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document_xml(paragraphs).as_bytes()).unwrap();
    if let Some(core) = core {
        zip.start_file("docProps/core.xml", options).unwrap();
        zip.write_all(core.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// A one-page PDF document and its catalog id, optionally with an
/// information dictionary author
pub fn pdf_document(author: Option<&str>) -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(author) = author {
        let info_id = doc.add_object(dictionary! {
            "Author" => Object::string_literal(author),
        });
        doc.trailer.set("Info", info_id);
    }
    (doc, catalog_id)
}

/// Write a one-page PDF, optionally with an information dictionary author
pub fn write_pdf(path: &Path, author: Option<&str>) {
    let (mut doc, _) = pdf_document(author);
    doc.save(path).unwrap();
}

/// Text of the main document part
pub fn read_document_xml(path: &Path) -> String {
    read_part(path, "word/document.xml")
}

pub fn read_part(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    std::io::Read::read_to_string(&mut entry, &mut text).unwrap();
    text
}

/// A shell script standing in for `libreoffice --headless --convert-to docx`
///
/// It copies `template` to `<outdir>/<stem>.docx`.
#[cfg(unix)]
pub fn write_fake_office(dir: &Path, template: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-office");
    let body = format!(
        "#!/bin/sh\n\
         # --headless --convert-to docx --outdir DIR FILE\n\
         name=$(basename \"$6\")\n\
         cp '{}' \"$5/${{name%.*}}.docx\"\n",
        template.display()
    );
    fs::write(&script, body).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// An office script that exits successfully without converting anything
#[cfg(unix)]
pub fn write_idle_office(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("idle-office");
    fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Bytes that pass the `.doc` signature check
pub fn fake_doc_bytes() -> Vec<u8> {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.extend_from_slice(&[0u8; 504]);
    bytes
}
