//! Text measurement and page flow.
//!
//! [`PageFlow`] is a top-to-bottom cursor over a sequence of pages. Every
//! placement checks the remaining height first and opens a new page when the
//! content would cross the bottom margin, so nothing is ever clipped.

use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::model::page::{FontStyle, PageElement, PageKind, RasterImage, RenderedPage};

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width assumed for characters outside the table (Latin-1 letters and friends).
const FALLBACK_WIDTH: u16 = 667;

/// Helvetica-Bold runs wider than regular; measured conservatively.
const BOLD_FACTOR: f32 = 1.1;

/// Spaces a tab expands to.
const TAB_WIDTH: usize = 4;

/// Slack for accumulated rounding when checking whether a block fits.
const FIT_TOLERANCE: f32 = 0.01;

fn char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, style: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    let width = units as f32 * size / 1000.0;
    match style {
        FontStyle::Regular => width,
        FontStyle::Bold => width * BOLD_FACTOR,
    }
}

/// Replace tabs and drop control characters that have no glyph.
fn clean_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\t' => out.push_str(&" ".repeat(TAB_WIDTH)),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Greedy word wrap. Input newlines are kept as line breaks, blank lines
/// survive as empty strings, and words wider than `max_width` are split.
/// Leading indentation stays on the first output line of each input line.
pub fn wrap(text: &str, size: f32, style: FontStyle, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let line = clean_line(raw);
        if line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let words = line.trim_start_matches(' ');
        let indent = &line[..line.len() - words.len()];
        let mut current = String::new();
        for (i, word) in words.split(' ').enumerate() {
            let candidate = if i == 0 {
                format!("{indent}{word}")
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size, style) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // The word alone may still be too wide: hard-break it.
            for c in word.chars() {
                current.push(c);
                if text_width(&current, size, style) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Top-to-bottom placement of content across as many pages as needed.
pub struct PageFlow<'a> {
    layout: &'a LayoutConfig,
    kind: PageKind,
    source: Option<usize>,
    pages: Vec<RenderedPage>,
    current: RenderedPage,
    cursor: f32,
}

impl<'a> PageFlow<'a> {
    /// Start a flow whose pages all carry `kind` and `source`.
    pub fn new(layout: &'a LayoutConfig, kind: PageKind, source: Option<usize>) -> Self {
        Self {
            layout,
            kind,
            source,
            pages: Vec::new(),
            current: RenderedPage::new(kind, source),
            cursor: layout.page_height - layout.margin,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        self.layout
    }

    /// Height left above the bottom margin on the current page.
    pub fn remaining(&self) -> f32 {
        self.cursor - self.layout.margin
    }

    fn leading(&self, size: f32) -> f32 {
        size * self.layout.line_spacing
    }

    fn current_is_empty(&self) -> bool {
        self.current.elements.is_empty()
    }

    /// Close the current page and continue on a fresh one.
    /// Does nothing while the current page is still empty.
    pub fn page_break(&mut self) {
        if self.current_is_empty() {
            return;
        }
        let finished = std::mem::replace(
            &mut self.current,
            RenderedPage::new(self.kind, self.source),
        );
        self.pages.push(finished);
        self.cursor = self.layout.page_height - self.layout.margin;
    }

    /// Vertical whitespace; never carries over to the next page.
    pub fn gap(&mut self, amount: f32) {
        self.cursor = (self.cursor - amount).max(self.layout.margin);
    }

    /// Place one already-wrapped line, breaking the page first if it would
    /// cross the bottom margin. Returns the baseline.
    pub fn line(&mut self, text: &str, size: f32, style: FontStyle) -> f32 {
        let leading = self.leading(size);
        if leading > self.remaining() {
            self.page_break();
        }
        let baseline = self.cursor - size;
        self.current.elements.push(PageElement::Text {
            x: self.layout.margin,
            y: baseline,
            size,
            style,
            text: text.to_string(),
        });
        self.cursor -= leading;
        baseline
    }

    /// Wrap and place a block of text.
    pub fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap(text, size, FontStyle::Regular, self.layout.wrap_width()) {
            self.line(&line, size, FontStyle::Regular);
        }
    }

    /// Bold, underlined heading followed by half a line of space.
    pub fn heading(&mut self, text: &str, size: f32) {
        let lines = wrap(text, size, FontStyle::Bold, self.layout.wrap_width());
        for line in &lines {
            let baseline = self.line(line, size, FontStyle::Bold);
            let width = text_width(line, size, FontStyle::Bold);
            self.current.elements.push(PageElement::Rule {
                x1: self.layout.margin,
                x2: self.layout.margin + width,
                y: baseline - size * 0.12,
            });
        }
        self.gap(size * 0.5);
    }

    /// Place wrapped lines on one page.
    ///
    /// If their total height does not fit above the bottom margin, a new page
    /// is started first. A block taller than a whole page starts on a fresh
    /// page and then flows like a paragraph.
    pub fn keep_together(&mut self, lines: &[String], size: f32) {
        let height = lines.len() as f32 * self.leading(size);
        if height + FIT_TOLERANCE > self.remaining() {
            self.page_break();
        }
        for line in lines {
            self.line(line, size, FontStyle::Regular);
        }
    }

    /// Scale an image to fit the image box and center it horizontally, and
    /// vertically within the box.
    pub fn image(&mut self, image: Arc<RasterImage>) {
        let box_width = self.layout.image_box_width.min(self.layout.content_width());
        let box_height = self.layout.image_box_height.min(self.layout.content_height());
        if box_height > self.remaining() {
            self.page_break();
        }

        let (w, h) = (image.width.max(1) as f32, image.height.max(1) as f32);
        let scale = (box_width / w).min(box_height / h);
        let (width, height) = (w * scale, h * scale);

        let x = self.layout.margin + (self.layout.content_width() - width) / 2.0;
        let box_bottom = self.cursor - box_height;
        let y = box_bottom + (box_height - height) / 2.0;

        self.current.elements.push(PageElement::Image {
            x,
            y,
            width,
            height,
            image,
        });
        self.cursor = box_bottom;
    }

    /// Finish the flow. Always yields at least one page.
    pub fn finish(mut self) -> Vec<RenderedPage> {
        if !self.current_is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}
