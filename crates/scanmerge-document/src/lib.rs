// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanmerge-document — Document transformations for the Scanmerge pipeline.
//
// Provides PDF operations (read, write, page assembly, overlays, page images),
// image processing (resize, rotate, crop, brightness/contrast), scan cleanup
// and analysis (blank detection, skew estimation, OCR), and the stage
// collaborators built from them.

pub mod image;
pub mod pdf;
pub mod scan;
pub mod stages;

// Re-export the primary types so callers can use `scanmerge_document::PdfReader` etc.
pub use crate::image::processor::ImageProcessor;
pub use pdf::{PageAssembler, PdfReader};
pub use scan::enhance::ScanEnhancer;
pub use stages::DocumentCollaborators;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
