// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact manager: run-scoped scratch files for intermediate documents.
//
// One `ScratchArena` belongs to exactly one pipeline run. Every artifact it
// hands out is deleted when the arena is cleaned up or dropped, whichever
// comes first, so early returns cannot leak scratch files.

use std::path::{Path, PathBuf};

use scanmerge_core::error::Result;
use tempfile::TempPath;
use tracing::{debug, trace};

pub struct ScratchArena {
    dir: PathBuf,
    artifacts: Vec<TempPath>,
}

impl ScratchArena {
    /// An arena that places its artifacts in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            artifacts: Vec::new(),
        }
    }

    /// An arena in the system temporary directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifacts currently held.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Create a fresh, uniquely named, empty artifact and return its path.
    ///
    /// `label` only makes the file name easier to recognise.
    pub fn allocate(&mut self, label: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(&format!("scanmerge-{label}-"))
            .suffix(".pdf")
            .tempfile_in(&self.dir)?;
        let artifact = file.into_temp_path();
        let path = artifact.to_path_buf();
        trace!(path = %path.display(), "Scratch artifact allocated");
        self.artifacts.push(artifact);
        Ok(path)
    }

    /// Delete every artifact allocated so far. Deletion errors are ignored;
    /// calling this again is harmless.
    pub fn cleanup_all(&mut self) {
        let count = self.artifacts.len();
        for artifact in self.artifacts.drain(..) {
            let path = artifact.to_path_buf();
            if let Err(err) = artifact.close() {
                debug!(path = %path.display(), %err, "Scratch artifact already gone");
            }
        }
        if count > 0 {
            debug!(count, "Scratch artifacts removed");
        }
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}
