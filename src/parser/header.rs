//! Subject and date lookup on a bare header block.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

/// Subject and arrival date read from a header block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSummary {
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
}

/// Read the decoded subject and the `Date:` of a message without touching its body.
///
/// RFC 2047 encoded-words and the `Date:` value are decoded by `mail-parser`;
/// an unparseable date leaves `date` empty.
pub fn summarize_headers(header_bytes: &[u8]) -> HeaderSummary {
    let Some(msg) = MessageParser::default().parse_headers(header_bytes) else {
        return HeaderSummary::default();
    };

    let subject = msg.subject().unwrap_or_default().to_string();
    let date = msg
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

    HeaderSummary { subject, date }
}
