// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge stage: combine several input documents into one working document.
//
// Page order is decided up front from page counts alone (`page_order`), then
// the pages are copied in that order. Every input is read completely before
// the first page is copied, and the result is written in a single call.

use std::fs;
use std::path::Path;

use lopdf::ObjectId;
use scanmerge_core::config::MergeMode;
use scanmerge_core::error::{Result, ScanmergeError};
use scanmerge_core::types::DocumentInput;
use scanmerge_document::pdf::writer::to_bytes;
use scanmerge_document::{PageAssembler, PdfReader};
use tracing::{debug, info, instrument, warn};

/// Shape of one input as far as ordering is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSource {
    pub pages: usize,
    pub reverse: bool,
}

impl PageSource {
    pub fn new(pages: usize, reverse: bool) -> Self {
        Self { pages, reverse }
    }

    /// Natural page index of the page this input contributes at `position`.
    fn page_at(self, position: usize) -> usize {
        if self.reverse {
            self.pages - 1 - position
        } else {
            position
        }
    }
}

/// One output page: which input it comes from and its 0-based page index
/// within that input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub input: usize,
    pub page: usize,
}

/// Output page sequence for `sources` under `mode`.
pub fn page_order(mode: MergeMode, sources: &[PageSource]) -> Vec<PageRef> {
    match mode {
        MergeMode::Concatenate => concatenate(sources),
        MergeMode::Interleave if sources.len() < 2 => {
            debug!("Interleave needs two inputs, concatenating instead");
            concatenate(sources)
        }
        MergeMode::Interleave => interleave(sources),
    }
}

fn concatenate(sources: &[PageSource]) -> Vec<PageRef> {
    sources
        .iter()
        .enumerate()
        .flat_map(|(input, &source)| {
            (0..source.pages).map(move |position| PageRef {
                input,
                page: source.page_at(position),
            })
        })
        .collect()
}

/// Round-robin by position; inputs that run out drop out of the rotation.
fn interleave(sources: &[PageSource]) -> Vec<PageRef> {
    let longest = sources.iter().map(|source| source.pages).max().unwrap_or(0);
    let total = sources.iter().map(|source| source.pages).sum();
    let mut order = Vec::with_capacity(total);
    for position in 0..longest {
        for (input, &source) in sources.iter().enumerate() {
            if position < source.pages {
                order.push(PageRef {
                    input,
                    page: source.page_at(position),
                });
            }
        }
    }
    order
}

/// Merge `inputs` into a new document at `dest` and return its page count.
///
/// Any read, assembly, or write failure is reported as
/// [`ScanmergeError::MergeFailed`]; `dest` is removed in that case.
#[instrument(skip_all, fields(inputs = inputs.len(), mode = ?mode, dest = %dest.display()))]
pub fn merge_documents(inputs: &[DocumentInput], mode: MergeMode, dest: &Path) -> Result<usize> {
    let readers = inputs
        .iter()
        .map(|input| {
            PdfReader::open(input.path())
                .map_err(|err| ScanmergeError::MergeFailed(format!("{}: {}", input.path().display(), err)))
        })
        .collect::<Result<Vec<_>>>()?;

    let page_ids: Vec<Vec<ObjectId>> = readers.iter().map(PdfReader::page_ids).collect();
    let sources: Vec<PageSource> = page_ids
        .iter()
        .zip(inputs)
        .map(|(ids, input)| PageSource::new(ids.len(), input.reverse()))
        .collect();

    let order = page_order(mode, &sources);
    if order.is_empty() {
        return Err(ScanmergeError::MergeFailed("the inputs contain no pages".into()));
    }

    let mut assembler = PageAssembler::new();
    for PageRef { input, page } in &order {
        assembler
            .append_page(*input, readers[*input].document(), page_ids[*input][*page])
            .map_err(|err| {
                ScanmergeError::MergeFailed(format!(
                    "page {} of {}: {}",
                    page + 1,
                    inputs[*input].path().display(),
                    err
                ))
            })?;
    }

    let mut merged = assembler.finish();
    let written = to_bytes(&mut merged).and_then(|bytes| fs::write(dest, bytes).map_err(ScanmergeError::from));
    if let Err(err) = written {
        if let Err(cleanup) = fs::remove_file(dest) {
            debug!(%cleanup, "Nothing to remove after failed merge write");
        }
        warn!(%err, "Merge output could not be written");
        return Err(ScanmergeError::MergeFailed(err.to_string()));
    }

    info!(pages = order.len(), "Inputs merged");
    Ok(order.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(pairs: &[(usize, usize)]) -> Vec<PageRef> {
        pairs.iter().map(|&(input, page)| PageRef { input, page }).collect()
    }

    #[test]
    fn concatenation_keeps_declared_order() {
        let order = page_order(
            MergeMode::Concatenate,
            &[PageSource::new(2, false), PageSource::new(3, false)],
        );
        assert_eq!(order, refs(&[(0, 0), (0, 1), (1, 0), (1, 1), (1, 2)]));
    }

    #[test]
    fn reversed_input_contributes_pages_backwards() {
        let order = page_order(
            MergeMode::Concatenate,
            &[PageSource::new(3, false), PageSource::new(3, true)],
        );
        assert_eq!(order, refs(&[(0, 0), (0, 1), (0, 2), (1, 2), (1, 1), (1, 0)]));
    }

    /// Duplex scanning: odd pages front to back, even pages back to front.
    #[test]
    fn interleave_with_reversed_second_input() {
        let order = page_order(
            MergeMode::Interleave,
            &[PageSource::new(3, false), PageSource::new(3, true)],
        );
        assert_eq!(order, refs(&[(0, 0), (1, 2), (0, 1), (1, 1), (0, 2), (1, 0)]));
    }

    #[test]
    fn ragged_interleave_appends_the_excess() {
        let order = page_order(
            MergeMode::Interleave,
            &[PageSource::new(2, false), PageSource::new(3, false)],
        );
        assert_eq!(order, refs(&[(0, 0), (1, 0), (0, 1), (1, 1), (1, 2)]));
    }

    #[test]
    fn interleave_of_three_inputs_rotates_through_all() {
        let order = page_order(
            MergeMode::Interleave,
            &[
                PageSource::new(1, false),
                PageSource::new(2, false),
                PageSource::new(2, true),
            ],
        );
        assert_eq!(order, refs(&[(0, 0), (1, 0), (2, 1), (1, 1), (2, 0)]));
    }

    #[test]
    fn lone_input_interleave_is_concatenation() {
        let sources = [PageSource::new(4, true)];
        assert_eq!(
            page_order(MergeMode::Interleave, &sources),
            page_order(MergeMode::Concatenate, &sources)
        );
    }

    #[test]
    fn empty_inputs_contribute_nothing() {
        let order = page_order(
            MergeMode::Interleave,
            &[PageSource::new(0, true), PageSource::new(2, false)],
        );
        assert_eq!(order, refs(&[(1, 0), (1, 1)]));
        assert!(page_order(MergeMode::Concatenate, &[]).is_empty());
    }

    #[test]
    fn unreadable_input_fails_the_merge_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.pdf");
        fs::write(&junk, b"this is not a PDF").unwrap();
        let dest = dir.path().join("merged.pdf");

        let inputs = vec![DocumentInput::new(&junk, false).unwrap()];
        let err = merge_documents(&inputs, MergeMode::Concatenate, &dest).unwrap_err();

        assert!(matches!(err, ScanmergeError::MergeFailed(ref detail) if detail.contains("junk.pdf")));
        assert!(!dest.exists());
    }
}
