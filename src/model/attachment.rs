//! Attachments and their rendering classification.

use serde::Serialize;

use crate::render::classify;

/// The closed set of rendering strategies an attachment can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Appended verbatim during the merge stage.
    NativePdf,
    /// Embedded as a single picture page.
    Image,
    /// Converted to flowed text pages.
    WordDocument,
    /// Rendered sheet by sheet as pipe-delimited rows.
    Spreadsheet,
    /// Decoded as UTF-8 and rendered as-is.
    OtherText,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NativePdf => "native-pdf",
            Self::Image => "image",
            Self::WordDocument => "word-document",
            Self::Spreadsheet => "spreadsheet",
            Self::OtherText => "other-text",
        };
        f.write_str(name)
    }
}

/// One decoded MIME attachment.
///
/// The classification is computed once, from the declared content type and
/// filename, when the attachment is created and cannot change afterwards.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename from `Content-Disposition`/`Content-Type`. Generated if missing.
    pub filename: String,

    /// Declared MIME content type (e.g. `"image/jpeg"`), lowercased.
    pub content_type: String,

    /// Decoded size in bytes.
    pub size: u64,

    /// Decoded content (transfer encoding already removed).
    pub content: Vec<u8>,

    classification: Classification,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type.into().to_ascii_lowercase();
        let classification = classify(&content_type, &filename);
        Self {
            size: content.len() as u64,
            filename,
            content_type,
            content,
            classification,
        }
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_native_pdf(&self) -> bool {
        self.classification == Classification::NativePdf
    }
}
