// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage runner: thread the working document through the enabled stages.
//
// The working document is only ever replaced, never edited: each stage
// writes into a fresh scratch artifact, and only a stage that succeeds makes
// its artifact the new working document. A stage that is unavailable or
// fails is recorded and skipped. Committing the final document is the one
// step whose failure ends the run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use scanmerge_core::config::ProcessingConfig;
use scanmerge_core::error::{Result, ScanmergeError};
use scanmerge_core::stage::CollaboratorSet;
use scanmerge_core::types::{StageKind, StageOutcome, StageRecord, StageStatus};
use tracing::{debug, info, instrument, warn};

use crate::artifacts::ScratchArena;

/// Stage progress goes to `info` in verbose mode and `debug` otherwise.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// What a pass through the stages produced.
#[derive(Debug, Clone)]
pub struct StageRun {
    /// The last successfully written document (the input if no stage
    /// succeeded).
    pub working: PathBuf,
    pub stages: Vec<StageRecord>,
    /// Pages dropped by blank-page removal, as 0-based indices of the
    /// document the runner was given.
    pub removed_pages: Vec<usize>,
}

impl StageRun {
    /// A run in which no stage took part.
    pub(crate) fn untouched(working: &Path) -> Self {
        Self {
            working: working.to_path_buf(),
            stages: Vec::new(),
            removed_pages: Vec::new(),
        }
    }
}

pub struct StageRunner<'a> {
    config: &'a ProcessingConfig,
    collaborators: &'a dyn CollaboratorSet,
}

impl<'a> StageRunner<'a> {
    pub fn new(config: &'a ProcessingConfig, collaborators: &'a dyn CollaboratorSet) -> Self {
        Self { config, collaborators }
    }

    /// Run every enabled stage, in slot order, starting from `input`.
    ///
    /// Never fails: stage problems are logged and recorded in the returned
    /// [`StageRun`].
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn run(&self, input: &Path, arena: &mut ScratchArena) -> StageRun {
        let verbose = self.config.verbose;
        let mut working = input.to_path_buf();
        let mut stages = Vec::new();
        let mut removed_pages = Vec::new();

        let enabled = self.config.enabled_stages();
        if enabled.is_empty() {
            progress!(verbose, "No stages enabled, passing the document through");
        }

        for kind in enabled {
            let status = match self.attempt(kind, &working, arena) {
                Ok((artifact, outcome)) => {
                    if let StageOutcome::RemovedPages(pages) = outcome {
                        progress!(verbose, stage = %kind, removed = pages.len(), "Blank pages removed");
                        removed_pages.extend(pages);
                    }
                    progress!(verbose, stage = %kind, slot = kind.slot(), "Stage applied");
                    working = artifact;
                    StageStatus::Applied
                }
                Err(ScanmergeError::StageUnavailable { .. }) => {
                    warn!(stage = %kind, "Stage unavailable, skipping");
                    StageStatus::Unavailable
                }
                Err(ScanmergeError::StageFailed { reason, .. }) => {
                    warn!(stage = %kind, %reason, "Stage failed, skipping");
                    StageStatus::Failed { reason }
                }
                Err(err) => {
                    warn!(stage = %kind, %err, "Stage failed, skipping");
                    StageStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            stages.push(StageRecord { stage: kind, status });
        }

        StageRun {
            working,
            stages,
            removed_pages,
        }
    }

    /// Run one stage against `working`. Returns the new artifact on success.
    fn attempt(
        &self,
        kind: StageKind,
        working: &Path,
        arena: &mut ScratchArena,
    ) -> Result<(PathBuf, StageOutcome)> {
        let collaborator = self.collaborators.collaborator(kind, self.config);
        if !collaborator.is_available() {
            return Err(ScanmergeError::StageUnavailable { stage: kind });
        }

        let artifact = arena
            .allocate(kind.name())
            .map_err(|err| ScanmergeError::stage_failed(kind, err))?;
        progress!(self.config.verbose, stage = %kind, "Running stage");
        match collaborator.apply(working, &artifact) {
            Ok(outcome) => Ok((artifact, outcome)),
            Err(err @ (ScanmergeError::StageUnavailable { .. } | ScanmergeError::StageFailed { .. })) => Err(err),
            Err(err) => Err(ScanmergeError::stage_failed(kind, err)),
        }
    }
}

/// Copy `working` to `output` through a temporary file in the output's
/// directory, so `output` is either the complete document or untouched.
/// Returns the committed bytes.
#[instrument(skip_all, fields(output = %output.display()))]
pub fn commit(working: &Path, output: &Path) -> Result<Vec<u8>> {
    let failed = |reason: String| ScanmergeError::CommitFailed {
        path: output.to_path_buf(),
        reason,
    };

    let bytes = fs::read(working).map_err(|err| failed(format!("cannot read {}: {}", working.display(), err)))?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".scanmerge-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|err| failed(err.to_string()))?;
    staged.write_all(&bytes).map_err(|err| failed(err.to_string()))?;
    staged.as_file().sync_all().map_err(|err| failed(err.to_string()))?;
    staged.persist(output).map_err(|err| failed(err.error.to_string()))?;

    debug!(output_bytes = bytes.len(), "Result committed");
    Ok(bytes)
}
