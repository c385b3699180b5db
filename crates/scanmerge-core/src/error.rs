// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanmerge.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::StageKind;

/// Top-level error type for all Scanmerge operations.
#[derive(Debug, Error)]
pub enum ScanmergeError {
    // -- Run-level errors --
    #[error("input document not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("no input documents were given")]
    NoInputs,

    #[error("merge failed: {0}")]
    MergeFailed(String),

    #[error("could not write result to {}: {reason}", path.display())]
    CommitFailed { path: PathBuf, reason: String },

    // -- Stage errors (absorbed by the stage runner) --
    #[error("{stage} stage unavailable")]
    StageUnavailable { stage: StageKind },

    #[error("{stage} stage failed: {reason}")]
    StageFailed { stage: StageKind, reason: String },

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanmergeError {
    /// Whether this error ends a pipeline run.
    ///
    /// Stage-level errors are absorbed by the runner; everything else
    /// propagates to the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ScanmergeError::StageUnavailable { .. } | ScanmergeError::StageFailed { .. }
        )
    }

    /// Wrap any error raised while a collaborator was running.
    pub fn stage_failed(stage: StageKind, err: impl std::fmt::Display) -> Self {
        ScanmergeError::StageFailed {
            stage,
            reason: err.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanmergeError>;
