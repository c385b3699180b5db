// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input resolver: turn declared paths into validated document inputs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use scanmerge_core::error::Result;
use scanmerge_core::types::DocumentInput;
use tracing::{debug, instrument};

/// Validate `paths` in declared order, marking the ones named in
/// `reverse_indices` (0-based) as reversed.
///
/// Stops at the first path that does not exist. Indices past the end of
/// `paths` are ignored.
#[instrument(skip_all, fields(inputs = paths.len()))]
pub fn resolve_inputs<P>(paths: &[P], reverse_indices: &[usize]) -> Result<Vec<DocumentInput>>
where
    P: Clone + Into<PathBuf>,
{
    let reversed: BTreeSet<usize> = reverse_indices.iter().copied().collect();
    if let Some(&ignored) = reversed.range(paths.len()..).next() {
        debug!(index = ignored, "Reverse index out of range, ignoring");
    }

    paths
        .iter()
        .enumerate()
        .map(|(index, path)| DocumentInput::new(path.clone(), reversed.contains(&index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use scanmerge_core::error::ScanmergeError;

    use super::*;

    #[test]
    fn keeps_declared_order_and_reverse_flags() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("odd.pdf");
        let even = dir.path().join("even.pdf");
        fs::write(&odd, b"%PDF").unwrap();
        fs::write(&even, b"%PDF").unwrap();

        let inputs = resolve_inputs(&[odd.clone(), even.clone()], &[1, 7]).unwrap();

        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].path(), odd);
        assert!(!inputs[0].reverse());
        assert_eq!(inputs[1].path(), even);
        assert!(inputs[1].reverse());
    }

    #[test]
    fn first_missing_path_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.pdf");
        fs::write(&present, b"%PDF").unwrap();
        let first_missing = dir.path().join("gone-1.pdf");
        let second_missing = dir.path().join("gone-2.pdf");

        let err = resolve_inputs(&[present, first_missing.clone(), second_missing], &[]).unwrap_err();

        match err {
            ScanmergeError::InputNotFound { path } => assert_eq!(path, first_missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directories_are_not_documents() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_inputs(&[dir.path().to_path_buf()], &[]).is_err());
    }
}
