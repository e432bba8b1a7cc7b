//! MBOX-file transport: treats a local MBOX file as a single mailbox.
//!
//! Used to replay exported mailboxes (e.g. Gmail Takeout) through the
//! pipeline without a live server.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{MailboxConnector, MailboxSession, MessageId};
use crate::error::{PipelineError, Result};
use crate::model::mail::RawMessage;
use crate::model::request::RetrievalRequest;
use crate::parser::header;
use crate::parser::mbox::MboxParser;

/// Opens an MBOX file as a mailbox. Credentials in the request are ignored.
#[derive(Debug, Clone)]
pub struct MboxConnector {
    path: PathBuf,
}

impl MboxConnector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MailboxConnector for MboxConnector {
    fn connect(&self, _request: &RetrievalRequest) -> Result<Box<dyn MailboxSession>> {
        let parser = MboxParser::new(&self.path)
            .map_err(|e| PipelineError::connection(self.path.display().to_string(), e))?;
        Ok(Box::new(MboxSession {
            parser,
            messages: Vec::new(),
        }))
    }
}

/// One scanned message: where it lives and what its headers say.
struct MboxEntry {
    offset: u64,
    length: u64,
    summary: header::HeaderSummary,
}

struct MboxSession {
    parser: MboxParser,
    messages: Vec<MboxEntry>,
}

impl MailboxSession for MboxSession {
    /// An MBOX file is a single folder; any name selects it and triggers the scan.
    fn select_mailbox(&mut self, name: &str) -> Result<()> {
        let mut messages = Vec::new();
        self.parser.scan_headers(&mut |offset, length, headers| {
            messages.push(MboxEntry {
                offset,
                length,
                summary: header::summarize_headers(headers),
            });
            true
        })?;
        debug!(
            path = %self.parser.path().display(),
            mailbox = name,
            messages = messages.len(),
            "Scanned MBOX"
        );
        self.messages = messages;
        Ok(())
    }

    /// Case-insensitive substring match, like IMAP `SEARCH SUBJECT`.
    fn search_by_subject(&mut self, needle: &str) -> Result<Vec<MessageId>> {
        let needle = needle.to_lowercase();
        Ok(self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.summary.subject.to_lowercase().contains(&needle))
            .map(|(i, _)| i as MessageId)
            .collect())
    }

    fn fetch_raw_message(&mut self, id: MessageId) -> Result<RawMessage> {
        let entry = self.messages.get(id as usize).ok_or_else(|| {
            PipelineError::connection(
                self.parser.path().display().to_string(),
                format!("no message with id {id}"),
            )
        })?;
        let bytes = self.parser.read_message_at(entry.offset, entry.length)?;
        Ok(RawMessage::new(bytes, entry.summary.date))
    }

    fn close(&mut self) -> Result<()> {
        self.messages.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::retrieve;

    const MBOX: &str = "From a@example.com Thu Jan 04 10:00:00 2024\n\
Subject: Order ord-42 received\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\n\
\n\
First\n\
\n\
From b@example.com Fri Jan 05 10:00:00 2024\n\
Subject: Something else\n\
\n\
Other\n\
\n\
From c@example.com Sat Jan 06 10:00:00 2024\n\
Subject: Re: Order ORD-42 received\n\
Date: Sat, 06 Jan 2024 10:00:00 +0000\n\
\n\
Amount: $500\n";

    fn write_mbox() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, MBOX.as_bytes()).unwrap();
        file
    }

    fn request(order_id: &str) -> RetrievalRequest {
        RetrievalRequest::new("", "", "localhost", 0, order_id)
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let file = write_mbox();
        let connector = MboxConnector::new(file.path());
        let mut session = connector.connect(&request("ORD-42")).unwrap();
        session.select_mailbox("INBOX").unwrap();
        assert_eq!(session.search_by_subject("ORD-42").unwrap(), vec![0, 2]);
        assert!(session.search_by_subject("ORD-99").unwrap().is_empty());
        session.close().unwrap();
    }

    #[test]
    fn test_retrieve_latest_from_mbox() {
        let file = write_mbox();
        let raw = retrieve(&MboxConnector::new(file.path()), &request("ORD-42")).unwrap();
        let text = String::from_utf8_lossy(&raw.bytes);
        assert!(text.contains("Amount: $500"));
        assert_eq!(
            raw.received.map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2024-01-06".to_string())
        );
    }

    #[test]
    fn test_missing_file_is_connection_error() {
        let err = MboxConnector::new("/nonexistent/orders.mbox")
            .connect(&request("X"))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Connection { .. }));
    }
}
