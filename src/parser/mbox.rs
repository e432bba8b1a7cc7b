//! Streaming MBOX scanner.
//!
//! Reads MBOX files line-by-line through a buffered reader and reports each
//! message's offset, length and header block. Never loads the entire file
//! into memory. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{PipelineError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Streaming MBOX scanner.
///
/// Tolerates:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - UTF-8 BOM at the start of the file
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
}

impl MboxParser {
    /// Create a scanner for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| PipelineError::io(&path, e))?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the file, calling `header_callback` once per message in file order.
    ///
    /// The callback receives `(offset, message_length, header_bytes)` where
    /// `message_length` covers headers and body, and returns `true` to
    /// continue or `false` to stop early.
    ///
    /// Returns the number of messages reported.
    pub fn scan_headers(
        &self,
        header_callback: &mut dyn FnMut(u64, u64, &[u8]) -> bool,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| PipelineError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut header_buf: Vec<u8> = Vec::with_capacity(16 * 1024);
        let mut in_headers = false;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut prev_message_start: Option<u64> = None;
        let mut prev_headers: Option<Vec<u8>> = None;

        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| PipelineError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = match buf.iter().position(|&b| b == b'\n') {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }

                if let Some(pstart) = prev_message_start {
                    let headers = prev_headers.take().unwrap_or_else(|| header_buf.clone());
                    if !header_callback(pstart, current_offset - pstart, &headers) {
                        return Ok(count);
                    }
                    count += 1;
                }

                header_buf.clear();
                in_headers = true;
                prev_message_start = Some(current_offset);
            } else if in_headers {
                if is_blank_line(&line_buf) {
                    in_headers = false;
                    prev_headers = Some(std::mem::take(&mut header_buf));
                } else {
                    header_buf.extend_from_slice(&line_buf);
                }
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;
        }

        if let Some(pstart) = prev_message_start {
            let headers = prev_headers.unwrap_or(header_buf);
            if header_callback(pstart, current_offset - pstart, &headers) {
                count += 1;
            }
        }

        Ok(count)
    }

    /// Read a single message at the given offset and length.
    pub fn read_message_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path).map_err(|e| PipelineError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| PipelineError::io(&self.path, e))?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer)
            .map_err(|e| PipelineError::io(&self.path, e))?;
        Ok(buffer)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
