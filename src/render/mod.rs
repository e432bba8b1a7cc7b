//! Attachment rendering: classification and one handler per [`Classification`].
//!
//! A handler failure never escapes this module: it becomes an
//! [`AttachmentRenderError`] plus a fallback page in the attachment's slot.

pub mod image;
pub mod spreadsheet;
pub mod text;
pub mod word;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::error::AttachmentRenderError;
use crate::model::attachment::{Attachment, Classification};
use crate::model::page::{PageKind, RenderedPage};
use crate::pdf::layout::PageFlow;

/// Result of rendering one attachment.
#[derive(Debug)]
pub enum RenderOutcome {
    /// Native PDF: left for the merge stage.
    Skip,
    /// Pages in reading order.
    Rendered(Vec<RenderedPage>),
    /// Decoding failed; `pages` holds the fallback page.
    Failed {
        pages: Vec<RenderedPage>,
        error: AttachmentRenderError,
    },
}

/// Why a handler could not decode its attachment.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image decoding failed: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("not a valid Office container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("spreadsheet could not be read: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Assign a classification from the declared content type, falling back to
/// the filename extension when the content type is generic or unknown.
pub fn classify(content_type: &str, filename: &str) -> Classification {
    classify_content_type(content_type)
        .or_else(|| classify_extension(filename))
        .unwrap_or(Classification::OtherText)
}

fn classify_content_type(content_type: &str) -> Option<Classification> {
    let ct = content_type.trim().to_ascii_lowercase();
    let ct = ct.split(';').next().unwrap_or_default().trim();
    if ct == "application/pdf" || ct == "application/x-pdf" {
        Some(Classification::NativePdf)
    } else if ct.starts_with("image/") {
        Some(Classification::Image)
    } else if ct.contains("wordprocessingml") || ct == "application/msword" {
        Some(Classification::WordDocument)
    } else if ct.contains("spreadsheetml")
        || ct == "application/vnd.ms-excel"
        || ct == "application/vnd.oasis.opendocument.spreadsheet"
    {
        Some(Classification::Spreadsheet)
    } else if ct.starts_with("text/") {
        Some(Classification::OtherText)
    } else {
        None
    }
}

fn classify_extension(filename: &str) -> Option<Classification> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(Classification::NativePdf),
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "tif" | "tiff" => {
            Some(Classification::Image)
        }
        "docx" | "doc" => Some(Classification::WordDocument),
        "xlsx" | "xlsm" | "xls" | "ods" => Some(Classification::Spreadsheet),
        _ => None,
    }
}

/// Render one attachment according to its classification.
///
/// `index` is the attachment's position in the message and is recorded as
/// the source of every page produced.
pub fn render_attachment(
    index: usize,
    attachment: &Attachment,
    layout: &LayoutConfig,
) -> RenderOutcome {
    let result = match attachment.classification() {
        Classification::NativePdf => return RenderOutcome::Skip,
        Classification::Image => image::render(index, attachment, layout),
        Classification::WordDocument => word::render(index, attachment, layout),
        Classification::Spreadsheet => spreadsheet::render(index, attachment, layout),
        Classification::OtherText => Ok(text::render(index, attachment, layout)),
    };

    match result {
        Ok(pages) => {
            debug!(
                filename = %attachment.filename,
                classification = %attachment.classification(),
                pages = pages.len(),
                "Rendered attachment"
            );
            RenderOutcome::Rendered(pages)
        }
        Err(e) => {
            let error = AttachmentRenderError {
                filename: attachment.filename.clone(),
                reason: e.to_string(),
            };
            warn!(
                filename = %attachment.filename,
                classification = %attachment.classification(),
                error = %e,
                "Attachment could not be processed, using fallback page"
            );
            RenderOutcome::Failed {
                pages: fallback(index, attachment, &error.reason, layout),
                error,
            }
        }
    }
}

/// Start a flow for an attachment section, headed with its filename.
pub(crate) fn section<'a>(
    layout: &'a LayoutConfig,
    kind: PageKind,
    index: usize,
    attachment: &Attachment,
) -> PageFlow<'a> {
    let mut flow = PageFlow::new(layout, kind, Some(index));
    flow.heading(
        &format!("Attachment: {}", attachment.filename),
        layout.heading_font_size,
    );
    flow
}

/// The single placeholder page emitted for an attachment that failed to decode.
pub fn fallback(
    index: usize,
    attachment: &Attachment,
    reason: &str,
    layout: &LayoutConfig,
) -> Vec<RenderedPage> {
    let mut flow = section(layout, PageKind::Fallback, index, attachment);
    let size = layout.attachment_font_size;
    flow.paragraph("This attachment could not be processed.", layout.body_font_size);
    flow.gap(size);
    flow.paragraph(&format!("Type: {}", attachment.content_type), size);
    flow.paragraph(&format!("Reason: {reason}"), size);
    // One page only, whatever the reason's length.
    flow.finish().into_iter().take(1).collect()
}
