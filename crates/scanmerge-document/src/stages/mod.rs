// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage collaborators: one type per processing stage, each turning a source
// PDF file into a destination PDF file, plus the default `CollaboratorSet`
// that builds them from a `ProcessingConfig`.

pub mod blank;
pub mod deskew;
pub mod filter;
pub mod lossy;
pub mod metadata;
pub mod ocr;
pub mod optimize;
pub mod page_numbers;
pub mod watermark;

use std::path::Path;

use image::DynamicImage;
use lopdf::Document;
use scanmerge_core::config::ProcessingConfig;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::{Collaborator, CollaboratorSet};
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::warn;

use crate::pdf::images::{PageRaster, decode_image, page_rasters};
use crate::pdf::reader::PdfReader;
use crate::pdf::writer::save_document;
use crate::scan::ocr::OcrConfig;

pub use blank::BlankPageRemover;
pub use deskew::{AutoDeskew, BasicDeskew};
pub use filter::ImageFilter;
pub use lossy::LossyReencoder;
pub use metadata::MetadataWriter;
pub use ocr::OcrLayer;
pub use optimize::Optimizer;
pub use page_numbers::PageNumberer;
pub use watermark::Watermarker;

/// The collaborators this crate provides, parameterised from the
/// configuration at hand-out time.
#[derive(Debug, Clone, Default)]
pub struct DocumentCollaborators {
    ocr_models: OcrConfig,
}

impl DocumentCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load OCR models from `config` instead of the default cache directory.
    pub fn with_ocr_models(mut self, config: OcrConfig) -> Self {
        self.ocr_models = config;
        self
    }
}

impl CollaboratorSet for DocumentCollaborators {
    fn collaborator(&self, kind: StageKind, config: &ProcessingConfig) -> Box<dyn Collaborator> {
        match kind {
            StageKind::BlankPages => Box::new(BlankPageRemover::new(config.blank.threshold)),
            StageKind::AutoDeskew => Box::new(AutoDeskew::new(config.deskew.threshold)),
            StageKind::BasicDeskew => Box::new(BasicDeskew),
            StageKind::ImageFilter => Box::new(ImageFilter::new(config.image.clone())),
            StageKind::Lossy => Box::new(LossyReencoder::new(config.lossy.dpi, config.lossy.quality)),
            StageKind::Ocr => Box::new(OcrLayer::new(config.ocr.language.clone(), self.ocr_models.clone())),
            StageKind::Optimize => Box::new(Optimizer::new(config.optimize.compress_level)),
            StageKind::Watermark => Box::new(Watermarker::new(config.watermark.clone())),
            StageKind::PageNumbers => Box::new(PageNumberer::new(config.page_numbers.clone())),
            StageKind::Metadata => Box::new(MetadataWriter::new(config.metadata.clone())),
        }
    }
}

// -- Shared plumbing ----------------------------------------------------------

/// Load `source`, let `transform` edit it in memory, and write the result to
/// `dest` in one go.
pub(crate) fn rewrite(
    source: &Path,
    dest: &Path,
    transform: impl FnOnce(&mut Document) -> Result<StageOutcome, ScanmergeError>,
) -> Result<StageOutcome, ScanmergeError> {
    let mut document = PdfReader::open(source)?.into_document();
    let outcome = transform(&mut document)?;
    save_document(&mut document, dest)?;
    Ok(outcome)
}

/// Decode the dominant image of every page, skipping (with a warning) the
/// ones whose encoding is not supported.
pub(crate) fn decoded_rasters(
    document: &Document,
    stage: StageKind,
) -> impl Iterator<Item = (PageRaster, DynamicImage)> + '_ {
    page_rasters(document)
        .into_iter()
        .filter_map(move |raster| match decode_image(document, raster.image.id) {
            Ok(image) => Some((raster, image)),
            Err(err) => {
                warn!(%stage, page = raster.index, %err, "Page image left untouched");
                None
            }
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use lopdf::Document;
    use tempfile::TempDir;

    use crate::pdf::writer::save_document;

    /// Write `document` into a fresh temp dir; returns the dir (keep it
    /// alive), the source path, and a destination path next to it.
    pub(crate) fn fixture_files(mut document: Document) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pdf");
        let dest = dir.path().join("dest.pdf");
        save_document(&mut document, &source).unwrap();
        (dir, source, dest)
    }

    pub(crate) fn reopen(path: &std::path::Path) -> Document {
        Document::load(path).unwrap()
    }
}
