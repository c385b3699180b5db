// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: serialise `lopdf` documents to disk in one write.
//
// Documents are rendered into memory first, so a serialisation error never
// leaves a truncated file behind at the destination.

use std::fs;
use std::path::Path;

use lopdf::{Document, SaveOptions};
use scanmerge_core::error::ScanmergeError;
use tracing::{debug, instrument};

/// Serialise `document` to bytes with the classic cross-reference table.
pub fn to_bytes(document: &mut Document) -> Result<Vec<u8>, ScanmergeError> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| ScanmergeError::PdfError(format!("failed to serialise PDF: {}", err)))?;
    Ok(output)
}

/// Write `document` to `dest`.
#[instrument(skip_all, fields(dest = %dest.display()))]
pub fn save_document(document: &mut Document, dest: &Path) -> Result<(), ScanmergeError> {
    let bytes = to_bytes(document)?;
    fs::write(dest, &bytes)?;
    debug!(output_bytes = bytes.len(), "PDF written");
    Ok(())
}

/// Write `document` to `dest` using object and cross-reference streams.
#[instrument(skip_all, fields(dest = %dest.display()))]
pub fn save_document_with(
    document: &mut Document,
    dest: &Path,
    options: SaveOptions,
) -> Result<(), ScanmergeError> {
    let mut bytes = Vec::new();
    document
        .save_with_options(&mut bytes, options)
        .map_err(|err| ScanmergeError::PdfError(format!("failed to serialise PDF: {}", err)))?;
    fs::write(dest, &bytes)?;
    debug!(output_bytes = bytes.len(), "PDF written with object streams");
    Ok(())
}
