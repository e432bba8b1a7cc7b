//! Centralized error types for orderpdf.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Stage;

/// Fatal errors produced by the pipeline stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The mailbox session could not be opened, authenticated, or used.
    #[error("Mailbox connection error ({endpoint}): {reason}")]
    Connection { endpoint: String, reason: String },

    /// No message subject contains the order id.
    #[error("No message in '{mailbox}' has a subject containing '{order_id}'")]
    NotFound { mailbox: String, order_id: String },

    /// The raw bytes could not be decoded as a MIME message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The base document could not be serialized or re-read.
    #[error("PDF assembly error: {0}")]
    Assembly(String),

    /// The finished document could not be handed to storage.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Connection` variant for a `host:port` endpoint.
    pub fn connection(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<lopdf::Error> for PipelineError {
    fn from(source: lopdf::Error) -> Self {
        Self::Assembly(source.to_string())
    }
}

/// A fatal error together with the order and stage it happened in.
#[derive(Error, Debug)]
#[error("Order '{order_id}' failed while {stage}: {source}")]
pub struct RunError {
    pub order_id: String,
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

/// An attachment could not be turned into pages. Recovered with a fallback page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not render attachment '{filename}': {reason}")]
pub struct AttachmentRenderError {
    pub filename: String,
    pub reason: String,
}

/// A native PDF attachment could not be merged. Recovered by skipping it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not merge PDF attachment '{filename}': {reason}")]
pub struct MergeError {
    pub filename: String,
    pub reason: String,
}

/// Errors raised by an [`Uploader`](crate::upload::Uploader).
#[derive(Error, Debug)]
pub enum UploadError {
    /// The object key is empty or escapes the storage root.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Writing the object failed.
    #[error("Failed to store '{key}': {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },
}
