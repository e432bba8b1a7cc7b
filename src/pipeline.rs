//! The per-order pipeline:
//! `Idle → Retrieving → Parsing → Rendering → Assembling → Merging → Done`.
//!
//! Retrieval and parsing failures end the run in `Failed`. Attachment
//! failures during rendering and merging are recorded on the document and
//! the run carries on.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::LayoutConfig;
use crate::error::{PipelineError, RunError};
use crate::mailbox::{self, MailboxConnector};
use crate::metadata;
use crate::model::attachment::Attachment;
use crate::model::document::{
    AssembledDocument, AttachmentFailure, FailureStage, Manifest, PageOrigin, PDF_CONTENT_TYPE,
};
use crate::model::mail::RawMessage;
use crate::model::metadata::MetadataField;
use crate::model::request::RetrievalRequest;
use crate::parser::mime::parse_message;
use crate::pdf::merge::merge;
use crate::pdf::writer::{assemble, build_pages, AssemblyInput};
use crate::upload::Uploader;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Retrieving,
    Parsing,
    Rendering,
    Assembling,
    Merging,
    Uploading,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Parsing => "parsing",
            Self::Rendering => "rendering",
            Self::Assembling => "assembling",
            Self::Merging => "merging",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub document: AssembledDocument,
    pub manifest: Manifest,
}

/// Tracks and logs stage transitions for one run.
struct Run<'a> {
    order_id: &'a str,
    stage: Stage,
}

impl<'a> Run<'a> {
    fn start(order_id: &'a str) -> Self {
        Self {
            order_id,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!(order_id = self.order_id, from = %self.stage, to = %stage, "Pipeline stage");
        self.stage = stage;
    }

    /// Move to `Failed`, wrapping the error with the stage it happened in.
    fn fail(&mut self, source: PipelineError) -> RunError {
        let stage = self.stage;
        error!(
            order_id = self.order_id,
            stage = %stage,
            error = %source,
            "Pipeline failed"
        );
        self.stage = Stage::Failed;
        RunError {
            order_id: self.order_id.to_string(),
            stage,
            source,
        }
    }
}

/// Retrieves order messages through a connector and assembles them.
pub struct Pipeline<C> {
    connector: C,
    layout: LayoutConfig,
}

impl<C: MailboxConnector> Pipeline<C> {
    pub fn new(connector: C, layout: LayoutConfig) -> Self {
        Self { connector, layout }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Run the whole pipeline for `request.order_id`.
    pub fn run(&self, request: &RetrievalRequest) -> Result<PipelineOutput, RunError> {
        let mut run = Run::start(&request.order_id);
        run.enter(Stage::Retrieving);
        let raw = mailbox::retrieve(&self.connector, request).map_err(|e| run.fail(e))?;
        assemble_run(&mut run, &raw, &request.metadata_fields, &self.layout)
    }

    /// Run the pipeline and store the document under `key`.
    /// Returns the output and the storage location.
    pub fn run_and_upload(
        &self,
        request: &RetrievalRequest,
        uploader: &dyn Uploader,
        key: &str,
    ) -> Result<(PipelineOutput, String), RunError> {
        let output = self.run(request)?;

        let mut run = Run {
            order_id: &request.order_id,
            stage: Stage::Done,
        };
        run.enter(Stage::Uploading);
        let location = uploader
            .put(&output.document.bytes, key, PDF_CONTENT_TYPE)
            .map_err(|e| run.fail(e.into()))?;
        run.enter(Stage::Done);
        Ok((output, location))
    }
}

/// Assemble an already retrieved message (parsing through merging).
///
/// `supplied_fields` override body-derived metadata with the same key.
pub fn assemble_message(
    raw: &RawMessage,
    order_id: &str,
    supplied_fields: &[MetadataField],
    layout: &LayoutConfig,
) -> Result<PipelineOutput, RunError> {
    let mut run = Run::start(order_id);
    assemble_run(&mut run, raw, supplied_fields, layout)
}

fn assemble_run(
    run: &mut Run<'_>,
    raw: &RawMessage,
    supplied_fields: &[MetadataField],
    layout: &LayoutConfig,
) -> Result<PipelineOutput, RunError> {
    run.enter(Stage::Parsing);
    let mail = parse_message(raw).map_err(|e| run.fail(e))?;
    let fields = metadata::merge_fields(&metadata::extract(&mail.body_text), supplied_fields);

    run.enter(Stage::Rendering);
    let (pages, render_errors) = build_pages(run.order_id, &mail, &fields, layout);
    let mut failures: Vec<AttachmentFailure> = render_errors
        .into_iter()
        .map(|e| AttachmentFailure {
            filename: e.filename,
            stage: FailureStage::Rendering,
            reason: e.reason,
        })
        .collect();
    let mut origins: Vec<PageOrigin> = pages
        .iter()
        .map(|p| PageOrigin::Rendered {
            kind: p.kind,
            source: p.source,
        })
        .collect();

    run.enter(Stage::Assembling);
    let input = AssemblyInput {
        order_id: run.order_id,
        subject: &mail.subject,
        created: Utc::now(),
        layout,
    };
    let base = assemble(&input, &pages).map_err(|e| run.fail(e))?;

    run.enter(Stage::Merging);
    let natives: Vec<(usize, &Attachment)> = mail
        .attachments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_native_pdf())
        .collect();
    let merged = merge(&base, &natives).map_err(|e| run.fail(e))?;
    for &(attachment, count) in &merged.merged {
        origins.extend(std::iter::repeat(PageOrigin::Merged { attachment }).take(count));
    }
    failures.extend(merged.failures.into_iter().map(|e| AttachmentFailure {
        filename: e.filename,
        stage: FailureStage::Merging,
        reason: e.reason,
    }));

    let document = AssembledDocument {
        bytes: merged.bytes,
        pages: origins,
        attachment_count: mail.attachments.len(),
        failures,
        received: raw.received.or(mail.date),
    };
    let manifest = document.manifest();

    run.enter(Stage::Done);
    if !manifest.failed_attachments.is_empty() {
        warn!(
            order_id = run.order_id,
            failed = ?manifest.failed_attachments,
            "Some attachments could not be included"
        );
    }
    info!(
        order_id = run.order_id,
        pages = manifest.page_count,
        attachments = manifest.attachment_count,
        bytes = document.bytes.len(),
        "Document assembled"
    );
    Ok(PipelineOutput { document, manifest })
}
