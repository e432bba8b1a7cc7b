//! Raw and parsed mail types.

use chrono::{DateTime, Utc};

use super::attachment::Attachment;

/// Unparsed message bytes as fetched from the mailbox.
///
/// Produced by the retriever and consumed immediately by the parser.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// The full RFC 5322 message (an MBOX `From ` line is tolerated).
    pub bytes: Vec<u8>,

    /// Server arrival time (IMAP `INTERNALDATE`, or the `Date:` header for MBOX).
    pub received: Option<DateTime<Utc>>,
}

impl RawMessage {
    pub fn new(bytes: Vec<u8>, received: Option<DateTime<Utc>>) -> Self {
        Self { bytes, received }
    }
}

/// A decoded message: subject, plain-text body and attachments in MIME order.
#[derive(Debug, Clone)]
pub struct ParsedMail {
    /// Decoded subject line (empty if missing).
    pub subject: String,

    /// Plain-text body (from `text/plain`, or stripped from HTML). May be empty.
    pub body_text: String,

    /// Parsed `Date:` header, if present.
    pub date: Option<DateTime<Utc>>,

    /// Attachments in the order they appear in the MIME tree.
    pub attachments: Vec<Attachment>,
}
