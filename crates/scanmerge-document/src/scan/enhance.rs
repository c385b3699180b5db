// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: cleanup filters for scanned page images (denoise,
// despeckle, sharpen, contrast boost, binarization, autocrop) plus the page
// analysis the blank-page and deskew stages rely on.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// Luma above which a pixel counts as paper.
pub const WHITE_LEVEL: u8 = 250;

/// Luma below which a pixel counts as ink when looking for content bounds.
pub const CONTENT_LEVEL: u8 = 225;

/// Border, in pixels, kept around the content when autocropping.
pub const AUTOCROP_MARGIN: u32 = 10;

/// Skew estimates beyond this are treated as noise (a rotated page, a table
/// rule) rather than scanner skew.
pub const MAX_SKEW_DEGREES: f32 = 45.0;

/// Applies cleanup filters to one scanned page image.
///
/// Every method consumes `self` and returns the filtered image, so filters
/// chain:
///
/// ```ignore
/// let cleaned = ScanEnhancer::from_dynamic(page)
///     .despeckle()
///     .sharpen()
///     .binarize_otsu()
///     .into_dynamic();
/// ```
pub struct ScanEnhancer {
    /// The working image (kept as `DynamicImage` for flexibility).
    image: DynamicImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Create an enhancer wrapping an existing `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Borrow the current working image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the enhancer and return the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Filters --------------------------------------------------------------

    /// Gaussian blur with a small `sigma`, smoothing sensor noise.
    #[instrument(skip(self), fields(sigma))]
    pub fn denoise(self, sigma: f32) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gaussian_blur_f32(&gray, sigma)),
            other => DynamicImage::ImageRgb8(gaussian_blur_f32(&other.to_rgb8(), sigma)),
        };
        Self { image }
    }

    /// 3x3 median filter: removes isolated dust specks while keeping edges.
    #[instrument(skip(self))]
    pub fn despeckle(self) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(median_filter(&gray, 1, 1)),
            other => DynamicImage::ImageRgb8(median_filter(&other.to_rgb8(), 1, 1)),
        };
        Self { image }
    }

    /// Classic 3x3 sharpening kernel.
    #[instrument(skip(self))]
    pub fn sharpen(self) -> Self {
        let kernel = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
        Self {
            image: self.image.filter3x3(&kernel),
        }
    }

    /// Contrast 1.5, brightness 1.1, then a light unsharp mask. Makes faded
    /// scans legible without changing their colour model.
    #[instrument(skip(self))]
    pub fn enhance(self) -> Self {
        let image = ImageProcessor::from_dynamic(self.image)
            .adjust_contrast(1.5)
            .scale_brightness(1.1)
            .unsharpen(1.0, 3)
            .into_dynamic();
        Self { image }
    }

    /// Global black-and-white conversion with the threshold chosen by Otsu's
    /// method. Pixels at or below the Otsu level become ink.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_level(&gray);
        debug!(threshold, "Otsu threshold computed");

        let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = gray.get_pixel(x, y).0[0];
            Luma([if value <= threshold { 0 } else { 255 }])
        });
        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Trim uniform border around the content, keeping
    /// [`AUTOCROP_MARGIN`] pixels of paper. Pages without any content are
    /// returned unchanged.
    #[instrument(skip(self))]
    pub fn autocrop(self) -> Self {
        let Some((x0, y0, x1, y1)) = content_bounds(&self.image.to_luma8(), CONTENT_LEVEL) else {
            debug!("No content found; skipping autocrop");
            return self;
        };
        let (width, height) = (self.image.width(), self.image.height());
        let left = x0.saturating_sub(AUTOCROP_MARGIN);
        let top = y0.saturating_sub(AUTOCROP_MARGIN);
        let right = (x1 + 1 + AUTOCROP_MARGIN).min(width);
        let bottom = (y1 + 1 + AUTOCROP_MARGIN).min(height);

        let image = ImageProcessor::from_dynamic(self.image)
            .crop(left, top, right - left, bottom - top)
            .into_dynamic();
        Self { image }
    }

    /// Rotate the page to undo a measured `skew` (degrees, positive when the
    /// content leans clockwise).
    #[instrument(skip(self), fields(skew))]
    pub fn deskew(self, skew: f32) -> Self {
        Self {
            image: ImageProcessor::from_dynamic(self.image).rotate(-skew).into_dynamic(),
        }
    }
}

// -- Analysis -----------------------------------------------------------------

/// Fraction of pixels brighter than [`WHITE_LEVEL`].
pub fn white_ratio(gray: &GrayImage) -> f64 {
    let total = u64::from(gray.width()) * u64::from(gray.height());
    if total == 0 {
        return 1.0;
    }
    let white = gray.pixels().filter(|pixel| pixel.0[0] > WHITE_LEVEL).count() as u64;
    white as f64 / total as f64
}

/// Smallest rectangle `(x0, y0, x1, y1)`, inclusive, containing every pixel
/// darker than `level`.
pub fn content_bounds(gray: &GrayImage, level: u8) -> Option<(u32, u32, u32, u32)> {
    gray.enumerate_pixels()
        .filter(|(_, _, pixel)| pixel.0[0] < level)
        .fold(None, |bounds, (x, y, _)| match bounds {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
}

/// Estimate how far the text lines of a page lean, in degrees.
///
/// Edges are detected with Canny and straight lines found with a Hough
/// transform; the result is the median deviation from horizontal of the
/// near-horizontal lines. Positive values mean the content is rotated
/// clockwise. Returns `None` when the page has no usable lines.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn estimate_skew(gray: &GrayImage) -> Option<f32> {
    let blurred = gaussian_blur_f32(gray, 1.0);
    let edges = canny(&blurred, 50.0, 150.0);

    let vote_threshold = (gray.width() / 4).max(40);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold,
            suppression_radius: 8,
        },
    );

    let mut angles: Vec<f32> = lines.iter().filter_map(horizontal_deviation).collect();
    debug!(lines = lines.len(), horizontal = angles.len(), "Hough lines detected");
    if angles.is_empty() {
        return None;
    }

    angles.sort_by(f32::total_cmp);
    let mid = angles.len() / 2;
    let median = if angles.len() % 2 == 0 {
        (angles[mid - 1] + angles[mid]) / 2.0
    } else {
        angles[mid]
    };
    Some(median)
}

/// Deviation from horizontal of a Hough line, if it is within
/// [`MAX_SKEW_DEGREES`] of horizontal. A horizontal line has its normal at
/// 90 degrees.
fn horizontal_deviation(line: &PolarLine) -> Option<f32> {
    let deviation = line.angle_in_degrees as f32 - 90.0;
    (deviation.abs() <= MAX_SKEW_DEGREES).then_some(deviation)
}

// -- Tests --------------------------------------------------------------------
