// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the pipeline integration tests: small PDFs whose pages
// are told apart by MediaBox width, and scriptable fake collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lopdf::{Document, Object, dictionary};
use scanmerge_core::config::ProcessingConfig;
use scanmerge_core::error::{Result, ScanmergeError};
use scanmerge_core::stage::{Collaborator, CollaboratorSet};
use scanmerge_core::types::{StageKind, StageOutcome};

// ---------------------------------------------------------------------------
// PDF fixtures
// ---------------------------------------------------------------------------

/// Write a PDF with one empty page per entry of `widths` (page height 500).
pub fn write_pdf(dir: &Path, name: &str, widths: &[i64]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = widths
        .iter()
        .map(|&width| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 500.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Page widths of the PDF at `path`, in page order.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let media_box = doc
                .get_dictionary(page_id)
                .unwrap()
                .get(b"MediaBox")
                .and_then(Object::as_array)
                .unwrap();
            media_box[2].as_float().unwrap().round() as i64
        })
        .collect()
}

/// Number of entries left in `dir`.
pub fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

// ---------------------------------------------------------------------------
// Fake collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Check the source is a readable PDF, then copy it.
    Copy,
    Unavailable,
    /// Write junk to the destination, then report failure.
    Fail,
    /// Remove the first page and report it as blank.
    DropFirstPage,
}

/// Collaborators that follow a per-stage script and record every call.
#[derive(Clone, Default)]
pub struct FakeCollaborators {
    script: HashMap<StageKind, Behaviour>,
    calls: Arc<Mutex<Vec<StageKind>>>,
}

impl FakeCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: StageKind, behaviour: Behaviour) -> Self {
        self.script.insert(kind, behaviour);
        self
    }

    /// Handle on the call log; stays valid after the set is moved into a
    /// pipeline.
    pub fn calls(&self) -> Arc<Mutex<Vec<StageKind>>> {
        Arc::clone(&self.calls)
    }
}

impl CollaboratorSet for FakeCollaborators {
    fn collaborator(&self, kind: StageKind, _config: &ProcessingConfig) -> Box<dyn Collaborator> {
        Box::new(Fake {
            kind,
            behaviour: self.script.get(&kind).copied().unwrap_or(Behaviour::Copy),
            calls: Arc::clone(&self.calls),
        })
    }
}

struct Fake {
    kind: StageKind,
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<StageKind>>>,
}

impl Collaborator for Fake {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.behaviour != Behaviour::Unavailable
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome> {
        self.calls.lock().unwrap().push(self.kind);
        let mut doc = Document::load(source)
            .map_err(|err| ScanmergeError::PdfError(format!("fake got an unreadable source: {err}")))?;
        match self.behaviour {
            Behaviour::Copy => {
                fs::copy(source, dest)?;
                Ok(StageOutcome::Completed)
            }
            Behaviour::Unavailable => Err(ScanmergeError::StageUnavailable { stage: self.kind }),
            Behaviour::Fail => {
                fs::write(dest, b"%PDF-1.5 truncated")?;
                Err(ScanmergeError::PdfError("fake failure".into()))
            }
            Behaviour::DropFirstPage => {
                doc.delete_pages(&[1]);
                doc.save(dest).map_err(|err| ScanmergeError::PdfError(err.to_string()))?;
                Ok(StageOutcome::RemovedPages(vec![0]))
            }
        }
    }
}
