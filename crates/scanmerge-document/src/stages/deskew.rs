// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew stages: measured per-image skew correction, and the basic variant
// that only resets page rotation.

use std::path::Path;

use image::DynamicImage;
use lopdf::Document;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::pdf::images::{ImageEncoding, replace_image};
use crate::scan::enhance::{ScanEnhancer, estimate_skew};
use crate::stages::{decoded_rasters, rewrite};

/// Skew is measured on a copy no wider than this; the angle does not depend
/// on resolution and the Hough transform gets slow on full-size scans.
const ANALYSIS_WIDTH: u32 = 1000;

/// Detects the skew angle of each page image and rotates it back.
#[derive(Debug, Clone, Copy)]
pub struct AutoDeskew {
    threshold: f64,
}

impl AutoDeskew {
    /// Angles smaller than `threshold` degrees are left alone.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Straighten every page image in place; returns how many were rotated.
    #[instrument(skip_all, fields(threshold = self.threshold))]
    pub fn deskew(&self, document: &mut Document) -> Result<usize, ScanmergeError> {
        let rasters: Vec<_> = decoded_rasters(document, StageKind::AutoDeskew).collect();
        let mut corrected = 0;
        for (raster, image) in rasters {
            let Some(skew) = estimate_skew(&analysis_copy(&image).to_luma8()) else {
                debug!(page = raster.index, "No text lines found");
                continue;
            };
            if f64::from(skew.abs()) < self.threshold {
                debug!(page = raster.index, skew, "Skew below threshold");
                continue;
            }

            let straightened = ScanEnhancer::from_dynamic(image).deskew(skew).into_dynamic();
            let encoding = ImageEncoding::matching(document, raster.image.id);
            replace_image(document, raster.image.id, &straightened, encoding)?;
            debug!(page = raster.index, skew, "Page straightened");
            corrected += 1;
        }
        info!(corrected, "Auto deskew finished");
        Ok(corrected)
    }
}

fn analysis_copy(image: &DynamicImage) -> DynamicImage {
    if image.width() <= ANALYSIS_WIDTH {
        return image.clone();
    }
    ImageProcessor::from_dynamic(image.clone())
        .resize(ANALYSIS_WIDTH, u32::MAX)
        .into_dynamic()
}

impl Collaborator for AutoDeskew {
    fn kind(&self) -> StageKind {
        StageKind::AutoDeskew
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.deskew(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}

/// Resets every page's `/Rotate` to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicDeskew;

impl BasicDeskew {
    pub fn reset_rotation(&self, document: &mut Document) -> Result<(), ScanmergeError> {
        for page_id in document.get_pages().into_values() {
            document
                .get_dictionary_mut(page_id)
                .map_err(|err| ScanmergeError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?
                .set("Rotate", 0);
        }
        Ok(())
    }
}

impl Collaborator for BasicDeskew {
    fn kind(&self) -> StageKind {
        StageKind::BasicDeskew
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.reset_rotation(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}
