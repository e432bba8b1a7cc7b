//! `orderpdf`: turn an order email and all of its attachments into one PDF.
//!
//! The pipeline finds the newest message whose subject mentions an order id,
//! decodes it, extracts `key: value` metadata from the body, renders every
//! non-PDF attachment into pages, serializes the base document and finally
//! appends the pages of any PDF attachments verbatim.

pub mod config;
pub mod error;
pub mod mailbox;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod upload;
