// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-quality filter stage: cleanup filters and resolution cap applied to
// every page image.

use std::path::Path;

use image::DynamicImage;
use lopdf::Document;
use scanmerge_core::config::ImageFilterOptions;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::pdf::images::{ImageEncoding, PageRaster, relayout_page, replace_image};
use crate::scan::enhance::ScanEnhancer;
use crate::stages::{decoded_rasters, rewrite};

/// Gaussian sigma used by the denoise filter.
const DENOISE_SIGMA: f32 = 0.8;

/// Runs the enabled filters over each page image, in a fixed order:
/// autocrop, denoise, despeckle, enhance, sharpen, binarize, then the
/// max-DPI cap.
#[derive(Debug, Clone)]
pub struct ImageFilter {
    options: ImageFilterOptions,
}

impl ImageFilter {
    pub fn new(options: ImageFilterOptions) -> Self {
        Self { options }
    }

    /// Every filter except autocrop, which changes the page geometry.
    /// `dpi` is the image's current effective resolution.
    fn clean(&self, image: DynamicImage, dpi: f32) -> DynamicImage {
        let options = &self.options;
        let mut enhancer = ScanEnhancer::from_dynamic(image);
        if options.denoise {
            enhancer = enhancer.denoise(DENOISE_SIGMA);
        }
        if options.despeckle {
            enhancer = enhancer.despeckle();
        }
        if options.enhance {
            enhancer = enhancer.enhance();
        }
        if options.sharpen {
            enhancer = enhancer.sharpen();
        }
        if options.binarize {
            enhancer = enhancer.binarize_otsu();
        }

        let mut image = enhancer.into_dynamic();
        if let Some(max_dpi) = options.max_dpi.map(|max_dpi| max_dpi as f32) {
            if dpi > max_dpi {
                image = ImageProcessor::from_dynamic(image)
                    .downscale(max_dpi / dpi)
                    .into_dynamic();
            }
        }
        image
    }

    /// Filter every page image in place; returns how many were rewritten.
    #[instrument(skip_all)]
    pub fn filter_document(&self, document: &mut Document) -> Result<usize, ScanmergeError> {
        let rasters: Vec<_> = decoded_rasters(document, StageKind::ImageFilter).collect();
        let mut rewritten = 0;
        for (raster, image) in rasters {
            let before = (image.width(), image.height());
            let image = if self.options.autocrop {
                let cropped = ScanEnhancer::from_dynamic(image).autocrop().into_dynamic();
                if (cropped.width(), cropped.height()) != before {
                    fit_page_to_crop(document, &raster, before, &cropped)?;
                }
                cropped
            } else {
                image
            };
            let filtered = self.clean(image, raster.dpi());

            let encoding = ImageEncoding::matching(document, raster.image.id);
            replace_image(document, raster.image.id, &filtered, encoding)?;
            debug!(
                page = raster.index,
                from = ?before,
                to = ?(filtered.width(), filtered.height()),
                "Page image filtered"
            );
            rewritten += 1;
        }
        info!(rewritten, "Image filters applied");
        Ok(rewritten)
    }
}

/// After autocrop the image no longer spans the old page; shrink the page so
/// it does, keeping the image's resolution.
fn fit_page_to_crop(
    document: &mut Document,
    raster: &PageRaster,
    (before_w, before_h): (u32, u32),
    cropped: &DynamicImage,
) -> Result<(), ScanmergeError> {
    let [x0, y0, x1, y1] = raster.media_box;
    let points_per_px_x = (x1 - x0).abs() / before_w as f32;
    let points_per_px_y = (y1 - y0).abs() / before_h as f32;
    relayout_page(
        document,
        raster.page_id,
        &raster.image.name,
        cropped.width() as f32 * points_per_px_x,
        cropped.height() as f32 * points_per_px_y,
    )
}

impl Collaborator for ImageFilter {
    fn kind(&self) -> StageKind {
        StageKind::ImageFilter
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.filter_document(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::pdf::images::tests::scanned_document;
    use crate::pdf::images::{decode_image, page_rasters};
    use crate::pdf::reader::media_box;
    use crate::stages::testing::{fixture_files, reopen};

    fn options() -> ImageFilterOptions {
        ImageFilterOptions {
            enhance: false,
            denoise: false,
            binarize: false,
            sharpen: false,
            despeckle: false,
            autocrop: false,
            max_dpi: None,
        }
    }

    /// 200x200 px of paper with a dark block in the middle.
    fn framed_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(200, 200, Luma([255u8]));
        for y in 80..120 {
            for x in 50..150 {
                page.put_pixel(x, y, Luma([20u8]));
            }
        }
        page
    }

    #[test]
    fn caps_resolution() {
        // 200 px over 100 pt is 144 dpi.
        let mut doc = scanned_document(&[framed_page()], (100.0, 100.0));
        let filter = ImageFilter::new(ImageFilterOptions {
            max_dpi: Some(72),
            ..options()
        });
        filter.filter_document(&mut doc).unwrap();

        let raster = &page_rasters(&doc)[0];
        assert_eq!((raster.image.width, raster.image.height), (100, 100));
        assert_eq!(raster.media_box, [0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn autocrop_shrinks_the_page_with_the_image() {
        let doc = scanned_document(&[framed_page()], (100.0, 100.0));
        let (_dir, source, dest) = fixture_files(doc);
        let filter = ImageFilter::new(ImageFilterOptions {
            autocrop: true,
            ..options()
        });
        filter.apply(&source, &dest).unwrap();

        let out = reopen(&dest);
        let raster = &page_rasters(&out)[0];
        assert_eq!((raster.image.width, raster.image.height), (120, 60));
        // Half a point per pixel, as before.
        assert_eq!(media_box(&out, raster.page_id), [0.0, 0.0, 60.0, 30.0]);
    }

    #[test]
    fn binarize_leaves_only_black_and_white() {
        let page = GrayImage::from_fn(64, 64, |x, y| Luma([((x + y) * 2) as u8]));
        let mut doc = scanned_document(&[page], (64.0, 64.0));
        ImageFilter::new(ImageFilterOptions {
            binarize: true,
            despeckle: true,
            ..options()
        })
        .filter_document(&mut doc)
        .unwrap();

        let image = decode_image(&doc, page_rasters(&doc)[0].image.id).unwrap().to_luma8();
        assert!(image.pixels().all(|pixel| pixel.0[0] == 0 || pixel.0[0] == 255));
    }
}
