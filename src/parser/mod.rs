//! Email parsing: MBOX scanning, single-message files, header helpers, and MIME decoding.

pub mod eml;
pub mod header;
pub mod mbox;
pub mod mime;
