//! Any other attachment: decoded as UTF-8 (lossily) and flowed as text.
//! HTML documents are reduced to their text first.

use std::path::Path;

use crate::config::LayoutConfig;
use crate::model::attachment::Attachment;
use crate::model::page::{PageKind, RenderedPage};
use crate::parser::mime::html_to_text;

use super::section;

fn is_html(attachment: &Attachment) -> bool {
    let ct = attachment.content_type.split(';').next().unwrap_or_default().trim();
    ct == "text/html"
        || ct == "application/xhtml+xml"
        || Path::new(&attachment.filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

pub(super) fn render(index: usize, attachment: &Attachment, layout: &LayoutConfig) -> Vec<RenderedPage> {
    let decoded = String::from_utf8_lossy(&attachment.content);
    let text = if is_html(attachment) {
        html_to_text(&decoded)
    } else {
        decoded.into_owned()
    };
    let mut flow = section(layout, PageKind::Text, index, attachment);
    flow.paragraph(&text, layout.attachment_font_size);
    flow.finish()
}
