// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page numbering stage.

use std::path::Path;

use lopdf::Document;
use lopdf::content::Operation;
use scanmerge_core::config::{PageNumberOptions, PageNumberPosition};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{info, instrument};

use crate::pdf::overlay::{append_overlay, encode_text, name, real, register_resource, standard_font, text_width};
use crate::pdf::reader::media_box;
use crate::stages::rewrite;

const NUMBER_FONT: &str = "SmPnF";

/// Writes the 1-based page number on every page.
#[derive(Debug, Clone)]
pub struct PageNumberer {
    options: PageNumberOptions,
}

impl PageNumberer {
    pub fn new(options: PageNumberOptions) -> Self {
        Self { options }
    }

    #[instrument(skip_all, fields(position = %self.options.position))]
    pub fn number_pages(&self, document: &mut Document) -> Result<usize, ScanmergeError> {
        let font_id = standard_font(document, "Helvetica");
        let pages: Vec<_> = document.get_pages().into_values().collect();
        for (index, &page_id) in pages.iter().enumerate() {
            register_resource(document, page_id, b"Font", NUMBER_FONT.as_bytes(), font_id)?;
            let label = (index + 1).to_string();
            let (x, y) = self.anchor(&label, media_box(document, page_id));
            let operations = vec![
                Operation::new("q", vec![]),
                Operation::new("g", vec![0.into()]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![name(NUMBER_FONT), real(self.options.font_size)]),
                Operation::new("Td", vec![real(x), real(y)]),
                Operation::new("Tj", vec![encode_text(&label)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ];
            append_overlay(document, page_id, operations)?;
        }
        info!(pages = pages.len(), "Page numbers added");
        Ok(pages.len())
    }

    /// Baseline start of `label` for the configured position.
    fn anchor(&self, label: &str, [x0, y0, x1, y1]: [f32; 4]) -> (f32, f32) {
        let margin = self.options.margin;
        let width = text_width(label, self.options.font_size, false);
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (bottom, top) = (y0.min(y1), y0.max(y1));

        let y = if self.options.position.is_top() {
            top - margin
        } else {
            bottom + margin
        };
        let x = match self.options.position {
            PageNumberPosition::BottomCenter | PageNumberPosition::TopCenter => (left + right - width) / 2.0,
            PageNumberPosition::BottomRight | PageNumberPosition::TopRight => right - margin - width,
            PageNumberPosition::BottomLeft | PageNumberPosition::TopLeft => left + margin,
        };
        (x, y)
    }
}

impl Collaborator for PageNumberer {
    fn kind(&self) -> StageKind {
        StageKind::PageNumbers
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.number_pages(document)?;
            Ok(StageOutcome::Completed)
        })
    }
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use super::*;
    use crate::pdf::images::tests::scanned_document;
    use crate::stages::testing::{fixture_files, reopen};

    fn numberer(position: PageNumberPosition) -> PageNumberer {
        PageNumberer::new(PageNumberOptions {
            enabled: true,
            position,
            font_size: 10.0,
            margin: 20.0,
        })
    }

    #[test]
    fn numbers_follow_page_order() {
        let doc = scanned_document(&[GrayImage::new(4, 4), GrayImage::new(4, 4), GrayImage::new(4, 4)], (300.0, 400.0));
        let (_dir, source, dest) = fixture_files(doc);

        numberer(PageNumberPosition::BottomCenter).apply(&source, &dest).unwrap();

        let out = reopen(&dest);
        for (index, page_id) in out.get_pages().into_values().enumerate() {
            let content = String::from_utf8(out.get_page_content(page_id).unwrap()).unwrap();
            assert!(content.contains(&format!("({}) Tj", index + 1)), "{content}");
        }
    }

    #[test]
    fn anchors_respect_position_and_margin() {
        let page = [0.0, 0.0, 300.0, 400.0];
        let width = text_width("7", 10.0, false);

        let (x, y) = numberer(PageNumberPosition::BottomCenter).anchor("7", page);
        assert_eq!((x, y), ((300.0 - width) / 2.0, 20.0));

        let (x, y) = numberer(PageNumberPosition::TopRight).anchor("7", page);
        assert_eq!((x, y), (280.0 - width, 380.0));

        let (x, y) = numberer(PageNumberPosition::TopLeft).anchor("7", page);
        assert_eq!((x, y), (20.0, 380.0));
    }
}
