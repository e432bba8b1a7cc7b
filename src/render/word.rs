//! Word documents (`.docx`): the main document part is converted to simple
//! HTML and then to plain text, which is flowed across text pages.
//!
//! Only the OOXML container is understood. A legacy binary `.doc` is not a
//! zip archive and fails, which puts a fallback page in its slot.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::LayoutConfig;
use crate::model::attachment::Attachment;
use crate::model::page::{PageKind, RenderedPage};
use crate::parser::mime::html_to_text;

use super::{section, RenderError};

const DOCUMENT_PART: &str = "word/document.xml";

pub(super) fn render(
    index: usize,
    attachment: &Attachment,
    layout: &LayoutConfig,
) -> Result<Vec<RenderedPage>, RenderError> {
    let html = docx_to_html(&attachment.content)?;
    let text = html_to_text(&html);

    let mut flow = section(layout, PageKind::Text, index, attachment);
    flow.paragraph(&text, layout.attachment_font_size);
    Ok(flow.finish())
}

/// Read `word/document.xml` out of a `.docx` container and convert it.
pub fn docx_to_html(bytes: &[u8]) -> Result<String, RenderError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    document_xml_to_html(&xml)
}

/// Map WordprocessingML onto the handful of tags the text conversion knows:
/// paragraphs become `<p>`, breaks `<br>`, table rows `<tr>` with cells
/// joined by `" | "`.
fn document_xml_to_html(xml: &str) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(xml);
    let mut html = String::with_capacity(xml.len() / 4);
    let mut in_text = false;
    let mut cell_depth = 0usize;
    let mut first_cell = true;
    let mut cell_paragraphs = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" if cell_depth == 0 => html.push_str("<p>"),
                b"p" => {
                    if cell_paragraphs > 0 {
                        html.push(' ');
                    }
                    cell_paragraphs += 1;
                }
                b"tr" => {
                    html.push_str("<tr>");
                    first_cell = true;
                }
                b"tc" => {
                    if !first_cell {
                        html.push_str(" | ");
                    }
                    first_cell = false;
                    cell_paragraphs = 0;
                    cell_depth += 1;
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" | b"cr" => html.push_str("<br>"),
                b"tab" => html.push('\t'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if cell_depth == 0 => html.push_str("</p>"),
                b"tr" => html.push_str("</tr>"),
                b"tc" => cell_depth = cell_depth.saturating_sub(1),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                html.push_str(&escape_html(&text));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(html)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
