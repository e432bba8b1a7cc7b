//! Laid-out pages destined for the base document.
//!
//! Pages are fully positioned before serialization: the writer only turns
//! each element into PDF operators, it never decides where anything goes.

use std::sync::Arc;

use serde::Serialize;

/// What a rendered page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    /// Order id, subject, metadata and attachment listing.
    Title,
    /// Verbatim body text.
    Body,
    /// One embedded picture.
    Image,
    /// Flowed text from a Word document or a text attachment.
    Text,
    /// Spreadsheet rows.
    Table,
    /// Placeholder for an attachment that could not be processed.
    Fallback,
}

/// The two standard faces used by the base document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
}

/// Decoded 8-bit RGB pixels ready for embedding.
#[derive(Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes, row-major.
    pub rgb: Vec<u8>,
}

/// A positioned piece of page content. Coordinates are PDF points, origin bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub enum PageElement {
    /// One line of text; `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        text: String,
    },
    /// A horizontal rule (used to underline headings).
    Rule { x1: f32, x2: f32, y: f32 },
    /// A picture scaled into the given box; `(x, y)` is its lower-left corner.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: Arc<RasterImage>,
    },
}

/// One page of the base document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub kind: PageKind,
    /// Index into `ParsedMail::attachments` for attachment pages.
    pub source: Option<usize>,
    pub elements: Vec<PageElement>,
}

impl RenderedPage {
    pub fn new(kind: PageKind, source: Option<usize>) -> Self {
        Self {
            kind,
            source,
            elements: Vec::new(),
        }
    }

    /// All text lines on the page, top to bottom.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            PageElement::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
