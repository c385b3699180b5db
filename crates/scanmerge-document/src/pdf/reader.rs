// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDF documents and inspect their page tree using
// the `lopdf` crate.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use scanmerge_core::error::ScanmergeError;
use tracing::{debug, instrument};

/// US Letter, used when a page tree carries no usable /MediaBox at all.
pub const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page-tree attributes a page inherits from its ancestors when it does not
/// set them itself.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on /Parent hops, so a malformed tree with a cycle cannot hang us.
const MAX_TREE_DEPTH: usize = 64;

/// Reads an existing PDF and answers questions about its pages.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScanmergeError> {
        let path = path.as_ref();
        let document = Document::load(path)
            .map_err(|err| ScanmergeError::PdfError(format!("failed to open {}: {}", path.display(), err)))?;
        debug!(pages = document.get_pages().len(), "Document opened");
        Ok(Self { document })
    }

    /// Parse a document that is already in memory (e.g. freshly committed
    /// output).
    #[instrument(skip_all, fields(len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanmergeError> {
        let document = Document::load_mem(data)
            .map_err(|err| ScanmergeError::PdfError(format!("not a readable PDF: {}", err)))?;
        Ok(Self { document })
    }

    // -- Pages ----------------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object IDs in reading order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-indexed page number, so values come out ordered.
        self.document.get_pages().into_values().collect()
    }

    /// Width and height of each page's media box, in points.
    pub fn page_sizes(&self) -> Vec<(f32, f32)> {
        self.page_ids()
            .into_iter()
            .map(|page_id| {
                let [x0, y0, x1, y1] = media_box(&self.document, page_id);
                ((x1 - x0).abs(), (y1 - y0).abs())
            })
            .collect()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Look up `key` on a page, walking up the page tree for inheritable
/// attributes.
pub fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// A page's effective /MediaBox as `[x0, y0, x1, y1]`.
pub fn media_box(document: &Document, page_id: ObjectId) -> [f32; 4] {
    inherited_attribute(document, page_id, b"MediaBox")
        .and_then(|object| document.dereference(object).ok())
        .and_then(|(_, object)| object.as_array().ok())
        .and_then(|values| {
            let numbers: Vec<f32> = values
                .iter()
                .filter_map(|value| document.dereference(value).ok())
                .filter_map(|(_, value)| value.as_float().ok())
                .collect();
            <[f32; 4]>::try_from(numbers).ok()
        })
        .unwrap_or(FALLBACK_MEDIA_BOX)
}

/// A page's effective /Rotate, normalised into 0..360.
pub fn page_rotation(document: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(document, page_id, b"Rotate")
        .and_then(|object| object.as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360)
}
