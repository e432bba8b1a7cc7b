//! Spreadsheets: every sheet becomes a section of ` | `-joined rows.
//!
//! A row is never split across pages. Its wrapped height is measured first
//! and the row moves to a new page if it would cross the bottom margin.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Reader};

use crate::config::LayoutConfig;
use crate::model::attachment::Attachment;
use crate::model::page::{FontStyle, PageKind, RenderedPage};
use crate::pdf::layout::wrap;

use super::{section, RenderError};

const CELL_SEPARATOR: &str = " | ";

/// One worksheet as display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

pub(super) fn render(
    index: usize,
    attachment: &Attachment,
    layout: &LayoutConfig,
) -> Result<Vec<RenderedPage>, RenderError> {
    let sheets = read_sheets(&attachment.content)?;
    Ok(layout_sheets(index, attachment, &sheets, layout))
}

/// Read every sheet of a workbook (xlsx, xls, ods) in workbook order.
pub fn read_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, RenderError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

/// Lay out already-extracted sheets.
pub fn layout_sheets(
    index: usize,
    attachment: &Attachment,
    sheets: &[Sheet],
    layout: &LayoutConfig,
) -> Vec<RenderedPage> {
    let size = layout.attachment_font_size;
    let mut flow = section(layout, PageKind::Table, index, attachment);

    for (i, sheet) in sheets.iter().enumerate() {
        if i > 0 {
            flow.page_break();
        }
        flow.heading(&format!("Sheet: {}", sheet.name), layout.heading_font_size);

        for row in &sheet.rows {
            let line = row.join(CELL_SEPARATOR);
            let lines = wrap(&line, size, FontStyle::Regular, layout.wrap_width());
            flow.keep_together(&lines, size);
            flow.gap(size * 0.2);
        }
    }
    flow.finish()
}
