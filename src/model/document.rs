//! The pipeline's output: the final PDF, its page provenance and a manifest.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::page::PageKind;

/// Content type of every assembled document.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Where one page of the final document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "kebab-case")]
pub enum PageOrigin {
    /// Laid out by the assembler.
    Rendered {
        kind: PageKind,
        source: Option<usize>,
    },
    /// Copied verbatim from a native PDF attachment.
    Merged { attachment: usize },
}

/// Stage at which a recoverable attachment failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    Rendering,
    Merging,
}

/// A recoverable per-attachment failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentFailure {
    pub filename: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// The final document of one pipeline run.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub pages: Vec<PageOrigin>,
    pub attachment_count: usize,
    pub failures: Vec<AttachmentFailure>,
    /// Arrival time of the source message, if known.
    pub received: Option<DateTime<Utc>>,
}

impl AssembledDocument {
    /// Structural fingerprint of the document: one entry per page, in order.
    ///
    /// Two runs over the same message produce equal sequences even though
    /// their bytes differ (creation timestamps).
    pub fn page_kinds(&self) -> Vec<PageOrigin> {
        self.pages.clone()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            page_count: self.page_count(),
            attachment_count: self.attachment_count,
            failed_attachments: self.failures.iter().map(|f| f.filename.clone()).collect(),
            received_at: self.received,
        }
    }
}

/// Observability summary returned alongside the PDF bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub page_count: usize,
    pub attachment_count: usize,
    pub failed_attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}
