// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler: build a new PDF by copying pages, one at a time and in any
// order, out of one or more source documents.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use scanmerge_core::error::ScanmergeError;
use tracing::{debug, warn};

use crate::pdf::reader::{INHERITABLE_KEYS, inherited_attribute};

/// Accumulates pages from source documents into a fresh document.
///
/// Objects reachable from a copied page are cloned once per source document
/// and shared between all pages that use them, so fonts and images that
/// several pages reference are not duplicated. Reference cycles (an
/// annotation pointing back at its page, say) terminate because an object's
/// new ID is recorded before its contents are copied.
///
/// A reference to another page (a link's /Dest, an annotation's /P) only
/// reserves that page's target ID. The page is copied if and when it is
/// appended itself; otherwise the reference resolves to null.
pub struct PageAssembler {
    target: Document,
    /// Reserved ID of the target's root /Pages node, written by `finish`.
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// (source key, source object ID) -> target object ID.
    cloned: HashMap<(usize, ObjectId), ObjectId>,
    /// Same mapping, for page objects only.
    pages: HashMap<(usize, ObjectId), ObjectId>,
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAssembler {
    // -- Construction ---------------------------------------------------------

    pub fn new() -> Self {
        let mut target = Document::with_version("1.5");
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
            cloned: HashMap::new(),
            pages: HashMap::new(),
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    // -- Assembly -------------------------------------------------------------

    /// Append a copy of `page_id` from `source` as the next page.
    ///
    /// `source_key` identifies the source document; pass the same key for
    /// every page of one document so that shared objects are shared in the
    /// output too.
    pub fn append_page(
        &mut self,
        source_key: usize,
        source: &Document,
        page_id: ObjectId,
    ) -> Result<(), ScanmergeError> {
        let page = source.get_dictionary(page_id).map_err(|err| {
            ScanmergeError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        if source.version > self.target.version {
            self.target.version = source.version.clone();
        }

        // Attributes the page only has through its ancestors must be copied
        // onto it, since the ancestors do not come along.
        let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .into_iter()
            .filter(|key| !page.has(key))
            .filter_map(|key| {
                inherited_attribute(source, page_id, key).map(|value| (key, value.clone()))
            })
            .collect();

        let mut page = page.clone();
        page.remove(b"Parent");
        let new_page_id = self.page_reference(source_key, page_id);
        let copy = self.clone_dictionary(source_key, source, &page);
        self.target.objects.insert(new_page_id, Object::Dictionary(copy));

        let inherited: Vec<(&[u8], Object)> = inherited
            .into_iter()
            .map(|(key, value)| (key, self.clone_object(source_key, source, &value)))
            .collect();

        let page_dict = self
            .target
            .get_dictionary_mut(new_page_id)
            .map_err(|err| ScanmergeError::PdfError(format!("copied page is not a dictionary: {}", err)))?;
        for (key, value) in inherited {
            page_dict.set(key, value);
        }
        page_dict.set("Parent", Object::Reference(self.pages_id));

        self.kids.push(Object::Reference(new_page_id));
        debug!(source_key, ?page_id, ?new_page_id, "Page appended");
        Ok(())
    }

    /// Write the page tree and catalog, and hand back the finished document.
    pub fn finish(mut self) -> Document {
        for id in self.pages.values() {
            if !self.target.objects.contains_key(id) {
                debug!(?id, "Dropping reference to a page that was not appended");
                self.target.objects.insert(*id, Object::Null);
            }
        }
        let count = self.kids.len() as i64;
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.target.trailer.set("Root", catalog_id);
        self.target
    }

    // -- Cloning --------------------------------------------------------------

    /// Target ID of a source page, reserved on first use.
    fn page_reference(&mut self, source_key: usize, page_id: ObjectId) -> ObjectId {
        if let Some(&existing) = self.pages.get(&(source_key, page_id)) {
            return existing;
        }
        let new_id = self.target.new_object_id();
        self.pages.insert((source_key, page_id), new_id);
        new_id
    }

    /// Copy the object behind `id` (once) and return its ID in the target.
    fn clone_reference(&mut self, source_key: usize, source: &Document, id: ObjectId) -> ObjectId {
        if let Some(&existing) = self.cloned.get(&(source_key, id)) {
            return existing;
        }
        if source.get_dictionary(id).is_ok_and(|dict| dict.has_type(b"Page")) {
            return self.page_reference(source_key, id);
        }

        let new_id = self.target.new_object_id();
        self.cloned.insert((source_key, id), new_id);

        let copy = match source.get_object(id) {
            Ok(object) => self.clone_object(source_key, source, object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        self.target.objects.insert(new_id, copy);
        new_id
    }

    /// Deep-copy `object`, following references.
    fn clone_object(&mut self, source_key: usize, source: &Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.clone_reference(source_key, source, *id)),
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(source_key, source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_object(source_key, source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(source_key, source, &stream.dict);
                let mut copy = Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    /// A page's /Parent points into the source page tree; `append_page`
    /// re-points it. Every other /Parent (popups, form fields) is kept.
    fn clone_dictionary(&mut self, source_key: usize, source: &Document, dict: &Dictionary) -> Dictionary {
        let in_page_tree = dict.has_type(b"Page") || dict.has_type(b"Pages");
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if in_page_tree && key == b"Parent" {
                continue;
            }
            let value = self.clone_object(source_key, source, value);
            copy.set(key.clone(), value);
        }
        copy
    }
}
