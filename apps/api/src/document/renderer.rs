//! Document renderers.
//!
//! `WordMlRenderer` writes a single-part WordprocessingML package
//! (Flat OPC XML). Word and LibreOffice open it directly as a `.doc`.
//! Blocks are written in the order given; styling is fixed per block kind.

use bytes::Bytes;
use thiserror::Error;

use crate::document::assembler::DocumentBlock;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document has no content blocks")]
    EmptyDocument,
}

/// The rendering capability. Implementations must preserve block order.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, blocks: &[DocumentBlock]) -> Result<Bytes, RenderError>;
    fn content_type(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// WordprocessingML
// ────────────────────────────────────────────────────────────────────────────

const PACKAGE_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<?mso-application progid="Word.Document"?>
<pkg:package xmlns:pkg="http://schemas.microsoft.com/office/2006/xmlPackage">
<pkg:part pkg:name="/_rels/.rels" pkg:contentType="application/vnd.openxmlformats-package.relationships+xml">
<pkg:xmlData>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
</pkg:xmlData>
</pkg:part>
<pkg:part pkg:name="/word/document.xml" pkg:contentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml">
<pkg:xmlData>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
"#;

// A4, 2cm margins (twentieths of a point).
const PACKAGE_TAIL: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1134" w:right="1134" w:bottom="1134" w:left="1134" w:header="709" w:footer="709" w:gutter="0"/></w:sectPr>
</w:body>
</w:document>
</pkg:xmlData>
</pkg:part>
</pkg:package>
"#;

const FONT: &str = "Calibri";

/// Paragraph formatting for one block kind. Sizes are in half-points,
/// spacing in twentieths of a point.
#[derive(Debug, Clone, Copy, Default)]
struct ParagraphStyle {
    centered: bool,
    bold: bool,
    size: u32,
    space_before: u32,
    space_after: u32,
    rule_below: bool,
    indent: Option<(u32, u32)>,
}

fn style_for(block: &DocumentBlock) -> ParagraphStyle {
    match block {
        DocumentBlock::Heading { level: 1, .. } => ParagraphStyle {
            centered: true,
            bold: true,
            size: 36,
            space_after: 60,
            ..Default::default()
        },
        DocumentBlock::Heading { .. } => ParagraphStyle {
            bold: true,
            size: 23,
            space_before: 160,
            space_after: 20,
            ..Default::default()
        },
        DocumentBlock::CenteredLine { .. } => ParagraphStyle {
            centered: true,
            size: 21,
            space_after: 40,
            ..Default::default()
        },
        DocumentBlock::Label { .. } => ParagraphStyle {
            bold: true,
            size: 22,
            space_before: 240,
            space_after: 80,
            rule_below: true,
            ..Default::default()
        },
        DocumentBlock::Paragraph { .. } => ParagraphStyle {
            size: 21,
            space_after: 80,
            ..Default::default()
        },
        DocumentBlock::Bullet { .. } => ParagraphStyle {
            size: 21,
            space_after: 40,
            indent: Some((360, 240)),
            ..Default::default()
        },
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordMlRenderer;

impl WordMlRenderer {
    fn paragraph(block: &DocumentBlock) -> String {
        let style = style_for(block);

        let mut properties = String::new();
        if style.rule_below {
            properties.push_str(
                r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr>"#,
            );
        }
        properties.push_str(&format!(
            r#"<w:spacing w:before="{}" w:after="{}"/>"#,
            style.space_before, style.space_after
        ));
        if let Some((left, hanging)) = style.indent {
            properties.push_str(&format!(r#"<w:ind w:left="{left}" w:hanging="{hanging}"/>"#));
        }
        if style.centered {
            properties.push_str(r#"<w:jc w:val="center"/>"#);
        }

        let mut run_properties = format!(
            r#"<w:rFonts w:ascii="{FONT}" w:hAnsi="{FONT}" w:cs="{FONT}"/>"#
        );
        if style.bold {
            run_properties.push_str("<w:b/>");
        }
        run_properties.push_str(&format!(r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, style.size));

        let text = match block {
            DocumentBlock::Bullet { text } => format!("•\t{text}"),
            other => other.text().to_string(),
        };

        format!(
            r#"<w:p><w:pPr>{properties}</w:pPr><w:r><w:rPr>{run_properties}</w:rPr>{}</w:r></w:p>
"#,
            text_runs(&text)
        )
    }
}

impl DocumentRenderer for WordMlRenderer {
    fn render(&self, blocks: &[DocumentBlock]) -> Result<Bytes, RenderError> {
        if blocks.is_empty() {
            return Err(RenderError::EmptyDocument);
        }

        let mut xml = String::from(PACKAGE_HEAD);
        for block in blocks {
            xml.push_str(&Self::paragraph(block));
        }
        xml.push_str(PACKAGE_TAIL);

        Ok(Bytes::from(xml))
    }

    fn content_type(&self) -> &'static str {
        "application/msword"
    }

    fn file_extension(&self) -> &'static str {
        "doc"
    }
}

/// Text content of a run; tabs become `<w:tab/>`.
fn text_runs(text: &str) -> String {
    text.split('\t')
        .map(|part| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape_xml(part)))
        .collect::<Vec<_>>()
        .join("<w:tab/>")
}

/// Escapes markup characters and drops characters XML 1.0 cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
