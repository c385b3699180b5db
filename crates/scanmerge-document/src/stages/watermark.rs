// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark stage: semi-transparent rotated text across the middle of every
// page.

use std::path::Path;

use lopdf::Document;
use lopdf::content::Operation;
use scanmerge_core::config::WatermarkOptions;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{info, instrument};

use crate::pdf::overlay::{
    append_overlay, encode_text, name, opacity_state, real, register_resource, standard_font, text_width,
};
use crate::pdf::reader::media_box;
use crate::stages::rewrite;

const WATERMARK_FONT: &str = "SmWmF";
const WATERMARK_STATE: &str = "SmWmGs";
const WATERMARK_GRAY: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct Watermarker {
    options: WatermarkOptions,
}

impl Watermarker {
    pub fn new(options: WatermarkOptions) -> Self {
        Self { options }
    }

    /// Stamp every page of `document`. Does nothing without watermark text.
    #[instrument(skip_all, fields(opacity = self.options.opacity, size = self.options.font_size))]
    pub fn stamp(&self, document: &mut Document) -> Result<usize, ScanmergeError> {
        let Some(text) = self.options.text.as_deref() else {
            return Ok(0);
        };
        let font_id = standard_font(document, "Helvetica-Bold");
        let state_id = opacity_state(document, self.options.opacity);

        let pages: Vec<_> = document.get_pages().into_values().collect();
        for &page_id in &pages {
            register_resource(document, page_id, b"Font", WATERMARK_FONT.as_bytes(), font_id)?;
            register_resource(document, page_id, b"ExtGState", WATERMARK_STATE.as_bytes(), state_id)?;
            let operations = self.operations(text, media_box(document, page_id));
            append_overlay(document, page_id, operations)?;
        }
        info!(pages = pages.len(), "Watermark applied");
        Ok(pages.len())
    }

    /// Text centred on the page with its baseline through the centre, rotated
    /// counter-clockwise.
    fn operations(&self, text: &str, [x0, y0, x1, y1]: [f32; 4]) -> Vec<Operation> {
        let size = self.options.font_size;
        let (sin, cos) = self.options.rotation.to_radians().sin_cos();
        let centre_x = (x0 + x1) / 2.0;
        let centre_y = (y0 + y1) / 2.0;
        let half_width = text_width(text, size, true) / 2.0;

        vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![name(WATERMARK_STATE)]),
            Operation::new("g", vec![real(WATERMARK_GRAY)]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![name(WATERMARK_FONT), real(size)]),
            Operation::new(
                "Tm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(centre_x), real(centre_y)],
            ),
            Operation::new("Td", vec![real(-half_width), real(0.0)]),
            Operation::new("Tj", vec![encode_text(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]
    }
}

impl Collaborator for Watermarker {
    fn kind(&self) -> StageKind {
        StageKind::Watermark
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.stamp(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use lopdf::Object;

    use super::*;
    use crate::pdf::images::tests::scanned_document;
    use crate::stages::testing::{fixture_files, reopen};

    fn options(text: Option<&str>) -> WatermarkOptions {
        WatermarkOptions {
            text: text.map(str::to_owned),
            opacity: 0.3,
            font_size: 60.0,
            rotation: 45.0,
        }
    }

    #[test]
    fn stamps_every_page() {
        let page = GrayImage::from_pixel(10, 10, Luma([200u8]));
        let doc = scanned_document(&[page.clone(), page], (612.0, 792.0));
        let (_dir, source, dest) = fixture_files(doc);

        Watermarker::new(options(Some("DRAFT"))).apply(&source, &dest).unwrap();

        let out = reopen(&dest);
        for page_id in out.get_pages().into_values() {
            let content = String::from_utf8(out.get_page_content(page_id).unwrap()).unwrap();
            assert!(content.contains("(DRAFT) Tj"), "{content}");
            assert!(content.contains("/SmWmGs gs"));
            assert!(content.contains("/Im0 Do"));
        }
    }

    #[test]
    fn rotation_is_counter_clockwise_about_the_centre() {
        let marker = Watermarker::new(options(Some("X")));
        let operations = marker.operations("X", [0.0, 0.0, 200.0, 100.0]);
        let tm = operations.iter().find(|op| op.operator == "Tm").unwrap();
        let value = |index: usize| tm.operands[index].as_float().unwrap();
        assert!((value(1) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((value(2) + std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert_eq!(tm.operands[4], Object::Real(100.0));
        assert_eq!(tm.operands[5], Object::Real(50.0));
    }

    #[test]
    fn no_text_no_stamp() {
        let mut doc = scanned_document(&[GrayImage::new(4, 4)], (10.0, 10.0));
        assert_eq!(Watermarker::new(options(None)).stamp(&mut doc).unwrap(), 0);
    }
}
