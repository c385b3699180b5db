// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-page handling: cleanup filters, page analysis (whiteness, skew),
// and optical character recognition (OCR).

pub mod enhance;
pub mod ocr;

pub use enhance::{ScanEnhancer, estimate_skew, white_ratio};
pub use ocr::OcrConfig;

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
