//! Loader for individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::model::mail::RawMessage;
use crate::parser::header;

/// Read a single `.eml` file as a [`RawMessage`].
///
/// The received timestamp is taken from the message's `Date:` header.
pub fn read_eml(path: impl AsRef<Path>) -> Result<RawMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;

    let header_end = find_header_end(&data).unwrap_or(data.len());
    let received = header::summarize_headers(&data[..header_end]).date;

    Ok(RawMessage::new(data, received))
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i + 1);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i + 2);
        }
    }
    None
}
