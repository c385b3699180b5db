// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optimizer stage: structural cleanup and stream compression, with the effort
// picked by the 0-9 compression level.

use std::path::Path;

use lopdf::{Document, SaveOptions};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, info, instrument};

use crate::pdf::reader::PdfReader;
use crate::pdf::writer::{save_document, save_document_with};

/// Page entries that only matter to the application that wrote the file.
const DISPOSABLE_PAGE_KEYS: [&[u8]; 2] = [b"PieceInfo", b"Thumb"];

/// How hard the optimizer works for a given level. Each tier does
/// everything the previous one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptimizeTier {
    /// 0: drop unreachable objects and renumber, nothing else.
    Cleanup,
    /// 1-3: also Flate-compress every compressible stream.
    Fast,
    /// 4-6: also strip thumbnails and private application data from pages.
    Balanced,
    /// 7-9: also pack objects into object streams with an xref stream.
    Maximum,
}

impl OptimizeTier {
    pub fn for_level(level: u8) -> Self {
        match level {
            0 => OptimizeTier::Cleanup,
            1..=3 => OptimizeTier::Fast,
            4..=6 => OptimizeTier::Balanced,
            _ => OptimizeTier::Maximum,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    level: u8,
}

impl Optimizer {
    pub fn new(level: u8) -> Self {
        Self { level: level.min(9) }
    }

    pub fn tier(&self) -> OptimizeTier {
        OptimizeTier::for_level(self.level)
    }

    /// Apply the in-memory part of the optimisation.
    #[instrument(skip_all, fields(level = self.level))]
    pub fn optimize(&self, document: &mut Document) {
        let tier = self.tier();
        if tier >= OptimizeTier::Balanced {
            strip_disposable_entries(document);
        }
        let pruned = document.prune_objects();
        let emptied = document.delete_zero_length_streams();
        document.renumber_objects();
        if tier >= OptimizeTier::Fast {
            document.compress();
        }
        debug!(pruned = pruned.len(), emptied = emptied.len(), ?tier, "Document optimised");
    }
}

fn strip_disposable_entries(document: &mut Document) {
    for page_id in document.get_pages().into_values() {
        if let Ok(page) = document.get_dictionary_mut(page_id) {
            for key in DISPOSABLE_PAGE_KEYS {
                page.remove(key);
            }
        }
    }
    if let Ok(catalog) = document.catalog_mut() {
        catalog.remove(b"PieceInfo");
    }
}

impl Collaborator for Optimizer {
    fn kind(&self) -> StageKind {
        StageKind::Optimize
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        let mut document = PdfReader::open(source)?.into_document();
        let before = document.objects.len();
        self.optimize(&mut document);

        if self.tier() == OptimizeTier::Maximum {
            let options = SaveOptions::builder()
                .use_object_streams(true)
                .use_xref_streams(true)
                .compression_level(u32::from(self.level))
                .build();
            save_document_with(&mut document, dest, options)?;
        } else {
            save_document(&mut document, dest)?;
        }
        info!(objects_before = before, objects_after = document.objects.len(), "Optimizer finished");
        Ok(StageOutcome::Completed)
    }
}
