// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR stage: recognise the text of each page image and lay it over the page
// as invisible, searchable text.

use std::path::Path;

use lopdf::content::Operation;
use lopdf::{Document, Object, StringFormat};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};

use crate::pdf::overlay::{encode_text, name, real};
use crate::scan::ocr::OcrConfig;

/// Resource name of the font the text layer is set in.
const OCR_FONT: &str = "SmOcr";

/// Largest font size used for recognised lines.
const MAX_LINE_SIZE: f32 = 12.0;

/// Adds a text layer from OCR. Needs the `ocr` feature and the model files.
#[derive(Debug, Clone)]
pub struct OcrLayer {
    language: String,
    models: OcrConfig,
}

impl OcrLayer {
    pub fn new(language: String, models: OcrConfig) -> Self {
        Self { language, models }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Collaborator for OcrLayer {
    fn kind(&self) -> StageKind {
        StageKind::Ocr
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "ocr") && self.models.models_present()
    }

    #[cfg(feature = "ocr")]
    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        let engine = crate::scan::ocr::OcrEngine::new(&self.models)?;
        crate::stages::rewrite(source, dest, |document| {
            recognise::add_text_layer(&engine, document, &self.language)?;
            Ok(StageOutcome::Completed)
        })
    }

    #[cfg(not(feature = "ocr"))]
    fn apply(&self, _source: &Path, _dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        Err(ScanmergeError::StageUnavailable { stage: StageKind::Ocr })
    }
}

#[cfg(feature = "ocr")]
mod recognise {
    use lopdf::Document;
    use scanmerge_core::error::ScanmergeError;
    use scanmerge_core::types::StageKind;
    use tracing::{debug, info, instrument};

    use super::{OCR_FONT, set_language, text_layer_operations};
    use crate::pdf::overlay::{append_overlay, register_resource, standard_font};
    use crate::scan::ocr::OcrEngine;
    use crate::stages::decoded_rasters;

    #[instrument(skip_all, fields(language = %language))]
    pub(super) fn add_text_layer(
        engine: &OcrEngine,
        document: &mut Document,
        language: &str,
    ) -> Result<(), ScanmergeError> {
        let rasters: Vec<_> = decoded_rasters(document, StageKind::Ocr).collect();
        let font_id = standard_font(document, "Helvetica");
        let mut recognised = 0;
        for (raster, image) in rasters {
            let lines = engine.recognize_lines(&image)?;
            debug!(page = raster.index, lines = lines.len(), "Page recognised");
            if lines.is_empty() {
                continue;
            }
            register_resource(document, raster.page_id, b"Font", OCR_FONT.as_bytes(), font_id)?;
            append_overlay(document, raster.page_id, text_layer_operations(&lines, raster.media_box))?;
            recognised += 1;
        }
        set_language(document, language)?;
        info!(pages = recognised, "Text layer added");
        Ok(())
    }
}

/// Invisible (render mode 3) text, one recognised line per row, stacked from
/// the top of the page.
#[cfg_attr(not(feature = "ocr"), allow(dead_code))]
pub(crate) fn text_layer_operations(lines: &[String], media_box: [f32; 4]) -> Vec<Operation> {
    let [x0, y0, x1, y1] = media_box;
    let height = (y1 - y0).abs();
    let row = height / (lines.len() as f32 + 1.0);
    let size = (row * 0.8).clamp(1.0, MAX_LINE_SIZE);
    let left = x0.min(x1) + 10.0_f32.min((x1 - x0).abs() / 10.0);
    let top = y0.max(y1);

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tr", vec![3.into()]),
        Operation::new("Tf", vec![name(OCR_FONT), real(size)]),
    ];
    for (index, line) in lines.iter().enumerate() {
        let baseline = top - row * (index as f32 + 1.0);
        operations.push(Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), real(left), real(baseline)],
        ));
        operations.push(Operation::new("Tj", vec![encode_text(line)]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Record the document language in the catalog.
#[cfg_attr(not(feature = "ocr"), allow(dead_code))]
pub(crate) fn set_language(document: &mut Document, language: &str) -> Result<(), ScanmergeError> {
    document
        .catalog_mut()
        .map_err(|err| ScanmergeError::PdfError(format!("document has no catalog: {}", err)))?
        .set("Lang", Object::String(language.as_bytes().to_vec(), StringFormat::Literal));
    Ok(())
}
