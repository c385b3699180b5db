// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: geometric and tonal adjustments for decoded page images
// (resizing, rotation on a paper-white canvas, cropping, brightness, contrast,
// unsharp masking).

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{self, Interpolation};
use tracing::{debug, instrument};

/// Chainable adjustments on one page image.
///
/// Every method takes `self` by value and hands back the adjusted image, so a
/// stage reads as a single expression:
///
/// ```ignore
/// let page = ImageProcessor::from_dynamic(scan)
///     .rotate(-1.5)
///     .adjust_contrast(1.5)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Geometry -------------------------------------------------------------

    /// Fit inside `max_width` x `max_height`, keeping the aspect ratio
    /// (Lanczos3).
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn resize(self, max_width: u32, max_height: u32) -> Self {
        debug!(from = ?(self.image.width(), self.image.height()), "Resizing page image");
        Self {
            image: self
                .image
                .resize(max_width, max_height, image::imageops::FilterType::Lanczos3),
        }
    }

    /// Shrink both sides by `factor`. Factors outside (0, 1) leave the image
    /// alone.
    pub fn downscale(self, factor: f32) -> Self {
        if !(factor > 0.0 && factor < 1.0) {
            return self;
        }
        let width = ((self.image.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.image.height() as f32 * factor).round() as u32).max(1);
        self.resize(width, height)
    }

    /// Rotate clockwise by `degrees`.
    ///
    /// Quarter turns are exact and swap the dimensions. Any other angle keeps
    /// the canvas size and fills the exposed corners with white.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate(self, degrees: f32) -> Self {
        let turn = degrees.rem_euclid(360.0);
        let near = |target: f32| (turn - target).abs() < 0.01;
        let image = if near(0.0) || near(360.0) {
            self.image
        } else if near(90.0) {
            self.image.rotate90()
        } else if near(180.0) {
            self.image.rotate180()
        } else if near(270.0) {
            self.image.rotate270()
        } else {
            let radians = degrees.to_radians();
            match self.image {
                DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_gray(&gray, radians)),
                other => DynamicImage::ImageRgb8(rotate_rgb(&other.to_rgb8(), radians)),
            }
        };
        Self { image }
    }

    /// Keep the `width` x `height` region at (`x`, `y`), clamped to the image.
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let (full_width, full_height) = (self.image.width(), self.image.height());
        let x = x.min(full_width.saturating_sub(1));
        let y = y.min(full_height.saturating_sub(1));
        let width = width.min(full_width - x).max(1);
        let height = height.min(full_height - y).max(1);
        debug!(x, y, width, height, "Cropping page image");
        Self {
            image: self.image.crop_imm(x, y, width, height),
        }
    }

    // -- Tone -----------------------------------------------------------------

    /// Multiply every channel by `factor`.
    pub fn scale_brightness(self, factor: f32) -> Self {
        self.map_channels(|channel| channel as f32 * factor)
    }

    /// Stretch channel values away from mid-gray by `factor`.
    pub fn adjust_contrast(self, factor: f32) -> Self {
        self.map_channels(|channel| factor * (channel as f32 - 128.0) + 128.0)
    }

    pub fn unsharpen(self, sigma: f32, threshold: i32) -> Self {
        Self {
            image: self.image.unsharpen(sigma, threshold),
        }
    }

    /// Gray pages stay gray; anything else becomes RGB.
    fn map_channels(self, adjust: impl Fn(u8) -> f32) -> Self {
        let clamp = |value: f32| value.round().clamp(0.0, 255.0) as u8;
        let image = match self.image {
            DynamicImage::ImageLuma8(mut gray) => {
                gray.pixels_mut().for_each(|pixel| pixel.0[0] = clamp(adjust(pixel.0[0])));
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgb = other.to_rgb8();
                rgb.pixels_mut().for_each(|pixel| {
                    for channel in pixel.0.iter_mut() {
                        *channel = clamp(adjust(*channel));
                    }
                });
                DynamicImage::ImageRgb8(rgb)
            }
        };
        Self { image }
    }
}

fn rotate_gray(gray: &GrayImage, radians: f32) -> GrayImage {
    geometric_transformations::rotate_about_center(gray, radians, Interpolation::Bilinear, Luma([255u8]))
}

fn rotate_rgb(rgb: &RgbImage, radians: f32) -> RgbImage {
    geometric_transformations::rotate_about_center(
        rgb,
        radians,
        Interpolation::Bilinear,
        Rgb([255u8, 255, 255]),
    )
}
