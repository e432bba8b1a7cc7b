//! Core data model types: requests, messages, attachments, pages, and the assembled document.

pub mod attachment;
pub mod document;
pub mod mail;
pub mod metadata;
pub mod page;
pub mod request;
