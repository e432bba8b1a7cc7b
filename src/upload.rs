//! Storage boundary for finished documents.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::UploadError;

/// Stores a finished document and returns where it went.
pub trait Uploader {
    fn put(&self, bytes: &[u8], key: &str, content_type: &str) -> Result<String, UploadError>;
}

/// Writes objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` below the root. Empty keys, absolute keys and keys
    /// with `..` components are rejected.
    fn resolve(&self, key: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(key);
        if key.trim().is_empty() {
            return Err(UploadError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(UploadError::InvalidKey(key.to_string()));
                }
            }
        }
        Ok(path)
    }
}

impl Uploader for DirectoryUploader {
    fn put(&self, bytes: &[u8], key: &str, content_type: &str) -> Result<String, UploadError> {
        let path = self.resolve(key)?;
        let write_err = |source| UploadError::Write {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&path, bytes).map_err(write_err)?;

        let absolute = std::fs::canonicalize(&path).unwrap_or(path);
        info!(
            key,
            content_type,
            bytes = bytes.len(),
            path = %absolute.display(),
            "Stored document"
        );
        Ok(format!("file://{}", absolute.display()))
    }
}

/// Object key for an order's document: `<prefix>/<order id>-<unix millis>.pdf`.
pub fn document_key(prefix: &str, order_id: &str, at: DateTime<Utc>) -> String {
    let name = format!(
        "{}-{}.pdf",
        sanitize_filename_part(order_id, 80),
        at.timestamp_millis()
    );
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

/// Sanitize a string for use in a filename.
///
/// Keeps alphanumerics, `-`, `.`, `_` and `@`; everything else becomes `_`.
/// A string that would start with `.` is prefixed with `_` so it can never
/// name a parent or hidden entry.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else if sanitized.starts_with('.') {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("ORD 42/7", 20), "ORD_42_7");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
        assert_eq!(sanitize_filename_part("..", 20), "_..");
        assert_eq!(sanitize_filename_part("abcdef", 3), "abc");
    }

    #[test]
    fn test_document_key() {
        let at = DateTime::<Utc>::from_timestamp_millis(1_704_362_400_123).unwrap();
        assert_eq!(
            document_key("pdf", "ORD-42", at),
            "pdf/ORD-42-1704362400123.pdf"
        );
        assert_eq!(document_key("", "a/b", at), "a_b-1704362400123.pdf");
    }

    #[test]
    fn test_put_writes_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = DirectoryUploader::new(dir.path());
        let uri = uploader
            .put(b"%PDF-1.5", "pdf/ORD-1-1.pdf", "application/pdf")
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("ORD-1-1.pdf"));
        let written = std::fs::read(dir.path().join("pdf").join("ORD-1-1.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.5");
    }

    #[test]
    fn test_put_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = DirectoryUploader::new(dir.path());
        for key in ["../x.pdf", "/etc/x.pdf", "a/../../x.pdf", "", "  "] {
            assert!(
                matches!(
                    uploader.put(b"x", key, "application/pdf"),
                    Err(UploadError::InvalidKey(_))
                ),
                "accepted {key:?}"
            );
        }
    }
}
