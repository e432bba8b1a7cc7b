//! Appending native PDF attachments to the base document.
//!
//! Each source is loaded as an independent document, its objects are
//! renumbered past the base's highest id and its pages are hung directly
//! under the base's root page node, in their original order. Content
//! streams are copied untouched.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::{MergeError, PipelineError, Result};
use crate::model::attachment::Attachment;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// The merged document and what went into it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub bytes: Vec<u8>,
    /// `(attachment index, pages appended)` in merge order.
    pub merged: Vec<(usize, usize)>,
    pub failures: Vec<MergeError>,
}

/// Append every source PDF to `base`, in the order given.
///
/// A source that cannot be parsed, is encrypted or has no pages is skipped
/// and reported in [`MergeOutcome::failures`]. With no sources the base is
/// returned byte-for-byte.
pub fn merge(base: &[u8], sources: &[(usize, &Attachment)]) -> Result<MergeOutcome> {
    if sources.is_empty() {
        return Ok(MergeOutcome {
            bytes: base.to_vec(),
            merged: Vec::new(),
            failures: Vec::new(),
        });
    }

    let mut doc = Document::load_mem(base)?;
    let root_pages = root_pages_id(&doc)?;

    let mut merged = Vec::new();
    let mut failures = Vec::new();
    for &(index, attachment) in sources {
        match load_source(&attachment.content, doc.max_id + 1) {
            Ok((source, page_ids)) => {
                let count = page_ids.len();
                append(&mut doc, root_pages, source, &page_ids)?;
                debug!(filename = %attachment.filename, pages = count, "Merged PDF attachment");
                merged.push((index, count));
            }
            Err(reason) => {
                warn!(filename = %attachment.filename, %reason, "Skipping PDF attachment");
                failures.push(MergeError {
                    filename: attachment.filename.clone(),
                    reason,
                });
            }
        }
    }

    let mut bytes = Vec::with_capacity(base.len());
    doc.save_to(&mut bytes)
        .map_err(|e| PipelineError::Assembly(format!("serialization failed: {e}")))?;
    Ok(MergeOutcome {
        bytes,
        merged,
        failures,
    })
}

fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()?)
}

/// Load a source and prepare it for grafting: inherited attributes are
/// copied onto each page and all objects are renumbered from `start_id`.
/// Returns the page ids in page order.
fn load_source(bytes: &[u8], start_id: u32) -> std::result::Result<(Document, Vec<ObjectId>), String> {
    let mut source = Document::load_mem(bytes).map_err(|e| format!("not a readable PDF: {e}"))?;
    if source.is_encrypted() {
        return Err("document is encrypted".into());
    }

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err("document has no pages".into());
    }
    for &page_id in &page_ids {
        materialize_inherited(&mut source, page_id);
    }

    source.renumber_objects_with(start_id);
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    Ok((source, page_ids))
}

/// Copy inheritable attributes from the page's ancestors onto the page.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) {
    let mut found: Vec<(&[u8], Object)> = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return;
    };
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_value(doc, page, key) {
            found.push((key, value));
        }
    }
    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in found {
            page.set(key, value);
        }
    }
}

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut node = page;
    // Bounded walk; malformed trees may contain parent cycles.
    for _ in 0..64 {
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
    }
    None
}

fn is_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Catalog") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Move a prepared source's objects into `doc` and append its pages to the
/// root page node. The source's own catalog and page-tree nodes are dropped.
fn append(doc: &mut Document, root_pages: ObjectId, source: Document, page_ids: &[ObjectId]) -> Result<()> {
    for (id, object) in source.objects {
        if !is_tree_node(&object) {
            doc.objects.insert(id, object);
        }
    }
    doc.max_id = doc.max_id.max(source.max_id);

    for &page_id in page_ids {
        doc.get_dictionary_mut(page_id)?.set("Parent", root_pages);
    }

    let root = doc.get_dictionary_mut(root_pages)?;
    let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    root.set("Count", count + page_ids.len() as i64);
    let kids = root.get_mut(b"Kids")?.as_array_mut()?;
    kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));
    Ok(())
}
