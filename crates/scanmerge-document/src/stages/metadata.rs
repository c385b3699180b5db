// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata stage: document information dictionary.

use std::path::Path;

use chrono::{DateTime, Local};
use lopdf::{Dictionary, Document, Object, StringFormat};
use scanmerge_core::config::MetadataOptions;
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::stage::Collaborator;
use scanmerge_core::types::{StageKind, StageOutcome};
use tracing::{debug, instrument};

use crate::stages::rewrite;

/// Written as both /Creator and /Producer.
pub const PRODUCER: &str = "scanmerge";

#[derive(Debug, Clone)]
pub struct MetadataWriter {
    options: MetadataOptions,
}

impl MetadataWriter {
    pub fn new(options: MetadataOptions) -> Self {
        Self { options }
    }

    /// Fill the Info dictionary, creating it if the document has none.
    #[instrument(skip_all)]
    pub fn write_info(&self, document: &mut Document, now: DateTime<Local>) -> Result<(), ScanmergeError> {
        let date = pdf_date(now);
        let mut entries: Vec<(&str, Object)> = vec![
            ("Creator", pdf_text(PRODUCER)),
            ("Producer", pdf_text(PRODUCER)),
            ("CreationDate", pdf_text(&date)),
            ("ModDate", pdf_text(&date)),
        ];
        for (key, value) in [
            ("Title", &self.options.title),
            ("Author", &self.options.author),
            ("Subject", &self.options.subject),
            ("Keywords", &self.options.keywords),
        ] {
            if let Some(value) = value {
                entries.push((key, pdf_text(value)));
            }
        }

        let info = match document.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(info_id) => document
                .get_dictionary_mut(info_id)
                .map_err(|err| ScanmergeError::PdfError(format!("Info is not a dictionary: {}", err)))?,
            Err(_) => {
                let info_id = document.add_object(Dictionary::new());
                document.trailer.set("Info", info_id);
                document
                    .get_dictionary_mut(info_id)
                    .map_err(|err| ScanmergeError::PdfError(format!("cannot create Info: {}", err)))?
            }
        };
        for (key, value) in entries {
            info.set(key, value);
        }
        debug!(%date, "Document information written");
        Ok(())
    }
}

/// `D:YYYYMMDDHHmmSS`, the PDF date format.
pub fn pdf_date(moment: DateTime<Local>) -> String {
    moment.format("D:%Y%m%d%H%M%S").to_string()
}

/// A PDF text string: plain bytes for ASCII, UTF-16BE with a byte order mark
/// otherwise.
pub fn pdf_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

impl Collaborator for MetadataWriter {
    fn kind(&self) -> StageKind {
        StageKind::Metadata
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome, ScanmergeError> {
        rewrite(source, dest, |document| {
            self.write_info(document, Local::now())?;
            Ok(StageOutcome::Completed)
        })
    }
}
