// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blank page removal.

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, info, instrument, warn};

use crate::pdf::images::{decode_image, page_images};
use crate::scan::enhance::white_ratio;
use crate::stages::rewrite;

/// Content-stream operators that draw text or vector graphics.
const PAINTING_OPERATORS: &[&str] = &["S", "s", "f", "F", "f*", "B", "B*", "b", "b*", "sh", "Tj", "TJ", "'", "\""];

/// Content-stream operators that place an XObject or an inline image.
const IMAGE_OPERATORS: &[&str] = &["Do", "BI"];

/// What a page's content stream draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marks {
    Nothing,
    ImagesOnly,
    /// Text or vector graphics, possibly alongside images.
    TextOrPaths,
}

/// Drops pages that are (almost) entirely white paper.
#[derive(Debug, Clone, Copy)]
pub struct BlankPageRemover {
    threshold: f64,
}

impl BlankPageRemover {
    /// `threshold` is the share of near-white pixels, 0..=1, at which a
    /// page counts as blank.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// 0-based indices of the blank pages of `document`.
    pub fn blank_pages(&self, document: &Document) -> Vec<usize> {
        document
            .get_pages()
            .into_values()
            .enumerate()
            .filter(|(index, page_id)| self.is_blank(document, *index, *page_id))
            .map(|(index, _)| index)
            .collect()
    }

    /// Remove blank pages in place, unless that would remove every page.
    #[instrument(skip_all, fields(threshold = self.threshold))]
    pub fn remove_blank_pages(&self, document: &mut Document) -> Vec<usize> {
        let page_count = document.get_pages().len();
        let blank = self.blank_pages(document);
        if blank.is_empty() {
            return blank;
        }
        if blank.len() == page_count {
            warn!(page_count, "Every page looks blank; keeping them all");
            return Vec::new();
        }

        let page_numbers: Vec<u32> = blank.iter().map(|&index| index as u32 + 1).collect();
        document.delete_pages(&page_numbers);
        document.prune_objects();
        info!(removed = blank.len(), remaining = page_count - blank.len(), "Blank pages removed");
        blank
    }

    /// Text and vector marks always keep a page. A page that only draws
    /// images is judged by the whiteness of its largest image.
    fn is_blank(&self, document: &Document, index: usize, page_id: ObjectId) -> bool {
        let largest = page_images(document, page_id)
            .into_iter()
            .max_by_key(|image| u64::from(image.width) * u64::from(image.height));

        match (page_marks(document, page_id), largest) {
            (Marks::Nothing, _) => true,
            (Marks::TextOrPaths, _) => {
                debug!(page = index, "Page draws text or paths");
                false
            }
            // Form XObjects or inline images only: nothing we can measure.
            (Marks::ImagesOnly, None) => false,
            (Marks::ImagesOnly, Some(image)) => match decode_image(document, image.id) {
                Ok(pixels) => {
                    let ratio = white_ratio(&pixels.to_luma8());
                    debug!(page = index, ratio, "Page whiteness");
                    ratio >= self.threshold
                }
                Err(err) => {
                    warn!(page = index, %err, "Cannot inspect page image; keeping page");
                    false
                }
            },
        }
    }
}

/// Classify the page's content stream. Unreadable content counts as text.
fn page_marks(document: &Document, page_id: ObjectId) -> Marks {
    let Ok(bytes) = document.get_page_content(page_id) else {
        return Marks::TextOrPaths;
    };
    let Ok(content) = Content::decode(&bytes) else {
        return if bytes.iter().all(u8::is_ascii_whitespace) {
            Marks::Nothing
        } else {
            Marks::TextOrPaths
        };
    };

    let mut marks = Marks::Nothing;
    for operation in &content.operations {
        let operator = operation.operator.as_str();
        if PAINTING_OPERATORS.contains(&operator) {
            return Marks::TextOrPaths;
        }
        if IMAGE_OPERATORS.contains(&operator) {
            marks = Marks::ImagesOnly;
        }
    }
    marks
}

impl Collaborator for BlankPageRemover {
    fn kind(&self) -> StageKind {
        StageKind::BlankPages
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            Ok(StageOutcome::RemovedPages(self.remove_blank_pages(document)))
        })
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use lopdf::{Dictionary, Object, Stream, dictionary};

    use super::*;
    use crate::pdf::images::tests::scanned_document;
    use crate::stages::testing::{fixture_files, reopen};

    fn text_page() -> GrayImage {
        GrayImage::from_fn(50, 50, |_, y| Luma([if y % 5 == 0 { 0 } else { 255 }]))
    }

    /// White page with a few specks of dust: still blank at 0.99.
    fn dusty_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(50, 50, Luma([255u8]));
        for x in 0..5 {
            page.put_pixel(x * 10, 25, Luma([30u8]));
        }
        page
    }

    /// Pages without images: one stroked line, one empty content stream.
    fn vector_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for content in [&b"0 0 m 100 100 l S"[..], &b"q Q"[..]] {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
            kids.push(Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
                "Contents" => content_id,
            })));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => 2 }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    #[test]
    fn detects_white_and_dusty_pages() {
        let doc = scanned_document(
            &[text_page(), GrayImage::from_pixel(50, 50, Luma([255u8])), dusty_page()],
            (100.0, 100.0),
        );
        assert_eq!(BlankPageRemover::new(0.99).blank_pages(&doc), vec![1, 2]);
        // A stricter threshold keeps the dusty page.
        assert_eq!(BlankPageRemover::new(1.0).blank_pages(&doc), vec![1]);
    }

    #[test]
    fn pages_without_marks_are_blank() {
        let doc = vector_document();
        assert_eq!(BlankPageRemover::new(0.99).blank_pages(&doc), vec![1]);
    }

    /// Born-digital pages: a paragraph of text plus a small white logo.
    fn text_with_logo_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let logo_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 10,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![255u8; 100],
        ));
        let mut kids = Vec::new();
        for _ in 0..2 {
            let content = b"q 20 0 0 20 500 750 cm /Im1 Do Q BT /F1 12 Tf 72 700 Td (Quarterly report) Tj ET";
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
            kids.push(Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Im1" => logo_id },
                },
                "Contents" => content_id,
            })));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => 2 }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    #[test]
    fn text_keeps_a_page_with_a_white_image() {
        let doc = text_with_logo_document();
        assert!(BlankPageRemover::new(0.99).blank_pages(&doc).is_empty());
    }

    #[test]
    fn removes_pages_and_reports_indices() {
        let doc = scanned_document(
            &[GrayImage::from_pixel(50, 50, Luma([255u8])), text_page(), dusty_page(), text_page()],
            (100.0, 100.0),
        );
        let (_dir, source, dest) = fixture_files(doc);

        let outcome = BlankPageRemover::new(0.99).apply(&source, &dest).unwrap();

        assert_eq!(outcome, StageOutcome::RemovedPages(vec![0, 2]));
        assert_eq!(reopen(&dest).get_pages().len(), 2);
    }

    #[test]
    fn never_removes_every_page() {
        let white = GrayImage::from_pixel(50, 50, Luma([255u8]));
        let doc = scanned_document(&[white.clone(), white], (100.0, 100.0));
        let (_dir, source, dest) = fixture_files(doc);

        let outcome = BlankPageRemover::new(0.5).apply(&source, &dest).unwrap();

        assert_eq!(outcome, StageOutcome::RemovedPages(Vec::new()));
        assert_eq!(reopen(&dest).get_pages().len(), 2);
    }
}
