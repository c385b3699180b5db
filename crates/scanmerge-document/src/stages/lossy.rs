// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossy re-encoding stage: downsample page images to a target resolution and
// store them as JPEG.

use std::path::Path;

use lopdf::Document;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::pdf::images::{ImageEncoding, replace_image};
use crate::stages::{decoded_rasters, rewrite};

#[derive(Debug, Clone, Copy)]
pub struct LossyReencoder {
    dpi: u32,
    quality: u8,
}

impl LossyReencoder {
    pub fn new(dpi: u32, quality: u8) -> Self {
        Self { dpi, quality }
    }

    /// Re-encode every page image in place; returns how many were rewritten.
    #[instrument(skip_all, fields(dpi = self.dpi, quality = self.quality))]
    pub fn reencode(&self, document: &mut Document) -> Result<usize, ScanmergeError> {
        let rasters: Vec<_> = decoded_rasters(document, StageKind::Lossy).collect();
        let count = rasters.len();
        for (raster, image) in rasters {
            let current_dpi = raster.dpi();
            let image = ImageProcessor::from_dynamic(image)
                .downscale(self.dpi as f32 / current_dpi)
                .into_dynamic();
            replace_image(
                document,
                raster.image.id,
                &image,
                ImageEncoding::Jpeg { quality: self.quality },
            )?;
            debug!(page = raster.index, current_dpi, width = image.width(), "Page image re-encoded");
        }
        info!(count, "Lossy re-encoding finished");
        Ok(count)
    }
}

impl Collaborator for LossyReencoder {
    fn kind(&self) -> StageKind {
        StageKind::Lossy
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.reencode(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}
