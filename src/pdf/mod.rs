//! PDF production: page layout, serialization of the base document and
//! merging of native PDF attachments.

pub mod layout;
pub mod merge;
pub mod writer;

use crate::error::Result;

/// Number of pages in a serialized PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = lopdf::Document::load_mem(bytes)?;
    Ok(doc.get_pages().len())
}
