//! Minimal DOCX (Office Open XML) writer.
//!
//! A summary document only needs two block types: a level-1 heading and a
//! plain paragraph. The fixed parts are constants; `word/document.xml` is
//! emitted with `quick_xml::Writer`, and everything is packed with `zip`.
//!
//! Package layout:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! word/document.xml
//! word/styles.xml              (defines the Heading1 style)
//! word/_rels/document.xml.rels
//! ```

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="480" w:after="0"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style></w:styles>"#;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// One block of body content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
}

/// An in-memory document, written out as a `.docx` package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    blocks: Vec<Block>,
}

impl DocxDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_heading(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Heading(text.into()));
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render `word/document.xml`.
    pub fn document_xml(&self) -> std::io::Result<String> {
        let bytes = self.render_body().map_err(std::io::Error::other)?;
        String::from_utf8(bytes).map_err(std::io::Error::other)
    }

    fn render_body(&self) -> quick_xml::Result<Vec<u8>> {
        let mut xml = Writer::new(Vec::new());
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        xml.write_event(Event::Start(
            BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)]),
        ))?;
        xml.write_event(Event::Start(BytesStart::new("w:body")))?;

        for block in &self.blocks {
            xml.write_event(Event::Start(BytesStart::new("w:p")))?;
            let text = match block {
                Block::Heading(text) => {
                    xml.write_event(Event::Start(BytesStart::new("w:pPr")))?;
                    xml.write_event(Event::Empty(
                        BytesStart::new("w:pStyle").with_attributes([("w:val", "Heading1")]),
                    ))?;
                    xml.write_event(Event::End(BytesEnd::new("w:pPr")))?;
                    text
                }
                Block::Paragraph(text) => text,
            };
            write_run(&mut xml, text)?;
            xml.write_event(Event::End(BytesEnd::new("w:p")))?;
        }

        xml.write_event(Event::Empty(BytesStart::new("w:sectPr")))?;
        xml.write_event(Event::End(BytesEnd::new("w:body")))?;
        xml.write_event(Event::End(BytesEnd::new("w:document")))?;
        Ok(xml.into_inner())
    }

    /// Write the full package to `writer`.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> std::io::Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let document = self.document_xml()?;
        let parts: [(&str, &str); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML),
            ("_rels/.rels", ROOT_RELS_XML),
            ("word/document.xml", &document),
            ("word/styles.xml", STYLES_XML),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
        ];
        for (name, body) in parts {
            zip.start_file(name, options).map_err(std::io::Error::other)?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish().map_err(std::io::Error::other)?;
        Ok(())
    }
}

/// Write one run. Newlines become `<w:br/>`, tabs `<w:tab/>`.
fn write_run(xml: &mut Writer<Vec<u8>>, text: &str) -> quick_xml::Result<()> {
    xml.write_event(Event::Start(BytesStart::new("w:r")))?;
    let text = xml_chars(text);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.write_event(Event::Empty(BytesStart::new("w:br")))?;
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                xml.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            if !piece.is_empty() {
                xml.write_event(Event::Start(
                    BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
                ))?;
                xml.write_event(Event::Text(BytesText::new(piece)))?;
                xml.write_event(Event::End(BytesEnd::new("w:t")))?;
            }
        }
    }
    xml.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

/// Drop code points XML 1.0 cannot carry. `\n` and `\t` are kept for the
/// run writer to turn into elements.
fn xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| match c {
            '\n' | '\t' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => (c as u32) >= 0x20,
        })
        .collect()
}
