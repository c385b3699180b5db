// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanmerge pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanmergeError};

/// Unique identifier for one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared input document and whether its pages should be taken in
/// reverse order.
///
/// Construction checks that the path refers to an existing file, so a
/// `DocumentInput` in hand always pointed at a real document when it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    path: PathBuf,
    reverse: bool,
}

impl DocumentInput {
    /// Validate `path` and record the reversal flag.
    pub fn new(path: impl Into<PathBuf>, reverse: bool) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(ScanmergeError::InputNotFound { path });
        }
        Ok(Self { path, reverse })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }
}

/// The transformation stages, in slot order.
///
/// Auto and basic deskew share slot 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    BlankPages,
    AutoDeskew,
    BasicDeskew,
    ImageFilter,
    Lossy,
    Ocr,
    Optimize,
    Watermark,
    PageNumbers,
    Metadata,
}

impl StageKind {
    /// 1-based slot in the fixed stage sequence.
    pub fn slot(self) -> u8 {
        match self {
            StageKind::BlankPages => 1,
            StageKind::AutoDeskew | StageKind::BasicDeskew => 2,
            StageKind::ImageFilter => 3,
            StageKind::Lossy => 4,
            StageKind::Ocr => 5,
            StageKind::Optimize => 6,
            StageKind::Watermark => 7,
            StageKind::PageNumbers => 8,
            StageKind::Metadata => 9,
        }
    }

    /// Short name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::BlankPages => "blank-pages",
            StageKind::AutoDeskew => "auto-deskew",
            StageKind::BasicDeskew => "basic-deskew",
            StageKind::ImageFilter => "image-filter",
            StageKind::Lossy => "lossy",
            StageKind::Ocr => "ocr",
            StageKind::Optimize => "optimize",
            StageKind::Watermark => "watermark",
            StageKind::PageNumbers => "page-numbers",
            StageKind::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a collaborator reports after writing its destination document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageOutcome {
    /// The destination holds the transformed document.
    #[default]
    Completed,
    /// Blank-page removal: the destination lacks these 0-based source pages.
    RemovedPages(Vec<usize>),
}

/// How a stage slot ended during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StageStatus {
    Applied,
    Unavailable,
    Failed { reason: String },
}

/// One attempted stage in a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageKind,
    #[serde(flatten)]
    pub status: StageStatus,
}

/// Summary of a successful pipeline invocation.
///
/// Skipped stages appear here for diagnostics only; the run itself still
/// succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Committed output document.
    pub output: PathBuf,
    pub page_count: usize,
    /// Hex-encoded SHA-256 of the committed output.
    pub sha256: String,
    /// 0-based indices (in the merged document) removed as blank.
    pub removed_pages: Vec<usize>,
    pub stages: Vec<StageRecord>,
}

impl RunReport {
    /// Stages that were enabled but did not change the document.
    pub fn skipped(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages
            .iter()
            .filter(|record| record.status != StageStatus::Applied)
    }
}
