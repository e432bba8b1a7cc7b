//! IMAP transport (`imap` + `native-tls`).

use std::net::TcpStream;

use tracing::debug;

use super::{MailboxConnector, MailboxSession, MessageId};
use crate::error::{PipelineError, Result};
use crate::model::mail::RawMessage;
use crate::model::request::RetrievalRequest;

type TlsSession = imap::Session<native_tls::TlsStream<TcpStream>>;

/// Connects to an IMAP server with implicit TLS (`use_tls`) or STARTTLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

impl MailboxConnector for ImapConnector {
    fn connect(&self, request: &RetrievalRequest) -> Result<Box<dyn MailboxSession>> {
        let endpoint = request.endpoint();
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| PipelineError::connection(&endpoint, e))?;

        let address = (request.host.as_str(), request.port);
        let connected = if request.use_tls {
            imap::connect(address, request.host.as_str(), &tls)
        } else {
            imap::connect_starttls(address, request.host.as_str(), &tls)
        };
        let client = connected.map_err(|e| PipelineError::connection(&endpoint, e))?;

        let session = client
            .login(request.user.as_str(), request.password.as_str())
            .map_err(|(error, _client)| {
                PipelineError::connection(&endpoint, format!("authentication failed: {error}"))
            })?;

        debug!(endpoint = %endpoint, tls = request.use_tls, "IMAP session opened");
        Ok(Box::new(ImapSession { session, endpoint }))
    }
}

struct ImapSession {
    session: TlsSession,
    endpoint: String,
}

impl ImapSession {
    fn protocol_error(&self, error: imap::error::Error) -> PipelineError {
        PipelineError::connection(&self.endpoint, error)
    }
}

impl MailboxSession for ImapSession {
    fn select_mailbox(&mut self, name: &str) -> Result<()> {
        let mailbox = self
            .session
            .select(name)
            .map_err(|e| self.protocol_error(e))?;
        debug!(mailbox = name, exists = mailbox.exists, "Selected mailbox");
        Ok(())
    }

    fn search_by_subject(&mut self, needle: &str) -> Result<Vec<MessageId>> {
        let query = subject_query(needle);
        let found = self
            .session
            .search(&query)
            .map_err(|e| self.protocol_error(e))?;
        let mut ids: Vec<MessageId> = found.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_raw_message(&mut self, id: MessageId) -> Result<RawMessage> {
        let fetches = self
            .session
            .fetch(id.to_string(), "(RFC822 INTERNALDATE)")
            .map_err(|e| self.protocol_error(e))?;

        let fetch = fetches.iter().next().ok_or_else(|| {
            PipelineError::connection(&self.endpoint, format!("message {id} vanished"))
        })?;
        let body = fetch.body().ok_or_else(|| {
            PipelineError::connection(&self.endpoint, format!("message {id} has no body"))
        })?;
        let received = fetch
            .internal_date()
            .map(|d| d.with_timezone(&chrono::Utc));

        Ok(RawMessage::new(body.to_vec(), received))
    }

    fn close(&mut self) -> Result<()> {
        self.session.logout().map_err(|e| self.protocol_error(e))
    }
}

/// Build `SUBJECT "<needle>"`, escaping quotes and backslashes.
fn subject_query(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('"', "\\\"");
    format!("SUBJECT \"{escaped}\"")
}
