//! Mailbox retrieval: locate the newest message for an order and return its raw bytes.
//!
//! Transports implement [`MailboxConnector`] / [`MailboxSession`]. The
//! session is always held in a [`SessionGuard`], which closes it on every
//! exit path.

pub mod imap;
pub mod mbox;

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::model::mail::RawMessage;
use crate::model::request::RetrievalRequest;

/// Identifier of a message within the selected mailbox (IMAP sequence
/// number, or position in an MBOX file). Larger ids arrived later.
pub type MessageId = u32;

/// Opens sessions against a mail store.
pub trait MailboxConnector {
    /// Connect and authenticate. Fails with [`PipelineError::Connection`].
    fn connect(&self, request: &RetrievalRequest) -> Result<Box<dyn MailboxSession>>;
}

/// An open, authenticated mailbox session.
pub trait MailboxSession {
    /// Select the mailbox (folder) to search.
    fn select_mailbox(&mut self, name: &str) -> Result<()>;

    /// Ids of messages whose subject contains `needle`, in ascending arrival order.
    fn search_by_subject(&mut self, needle: &str) -> Result<Vec<MessageId>>;

    /// Fetch one message's raw bytes.
    fn fetch_raw_message(&mut self, id: MessageId) -> Result<RawMessage>;

    /// Log out and release the connection. Called at most once.
    fn close(&mut self) -> Result<()>;
}

/// Owns a session and guarantees `close` runs exactly once.
///
/// Call [`SessionGuard::finish`] on the success path; if the guard is dropped
/// first (an error returned early with `?`), `Drop` closes the session.
pub struct SessionGuard {
    session: Box<dyn MailboxSession>,
    closed: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn MailboxSession>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    /// Close the session now. A failed logout is logged, not returned:
    /// whatever was fetched is still valid.
    pub fn finish(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.session.close() {
            warn!(%error, "Mailbox logout failed");
        } else {
            debug!("Mailbox session closed");
        }
    }
}

impl std::ops::Deref for SessionGuard {
    type Target = dyn MailboxSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl std::ops::DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// Retrieve the message for `request.order_id`.
///
/// When several subjects match, the one that arrived last (last id in the
/// ascending search result) wins. No match is [`PipelineError::NotFound`].
pub fn retrieve(connector: &dyn MailboxConnector, request: &RetrievalRequest) -> Result<RawMessage> {
    let mut session = SessionGuard::new(connector.connect(request)?);

    session.select_mailbox(&request.mailbox)?;

    let matches = session.search_by_subject(&request.order_id)?;
    let Some(&latest) = matches.last() else {
        return Err(PipelineError::NotFound {
            mailbox: request.mailbox.clone(),
            order_id: request.order_id.clone(),
        });
    };

    info!(
        order_id = %request.order_id,
        matches = matches.len(),
        selected = latest,
        "Found order message"
    );

    let raw = session.fetch_raw_message(latest)?;
    session.finish();
    Ok(raw)
}
