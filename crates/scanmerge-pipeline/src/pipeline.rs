// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline facade: merge, process, or both, as one scoped run.
//
// Every public entry point opens a run span with a fresh run ID and owns one
// `ScratchArena` for the duration of the call. The arena is dropped on every
// exit path, so no scratch artifact outlives its run.

use std::path::{Path, PathBuf};

use scanmerge_core::config::{MergeMode, ProcessingConfig};
use scanmerge_core::error::{Result, ScanmergeError};
use scanmerge_core::stage::CollaboratorSet;
use scanmerge_core::types::{DocumentInput, RunId, RunReport};
use scanmerge_document::{DocumentCollaborators, PdfReader};
use tracing::{info, info_span, warn};

use crate::artifacts::ScratchArena;
use crate::integrity::hash_bytes;
use crate::merge::merge_documents;
use crate::runner::{StageRun, StageRunner, commit};

/// Run-level options that are not part of the processing configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub merge_mode: MergeMode,
    /// Where scratch artifacts are created. Defaults to the system temporary
    /// directory.
    pub scratch_dir: Option<PathBuf>,
}

pub struct Pipeline {
    config: ProcessingConfig,
    options: PipelineOptions,
    collaborators: Box<dyn CollaboratorSet>,
}

impl Pipeline {
    /// A pipeline using the built-in document collaborators.
    pub fn new(config: ProcessingConfig, options: PipelineOptions) -> Self {
        Self::with_collaborators(config, options, DocumentCollaborators::new())
    }

    pub fn with_collaborators(
        config: ProcessingConfig,
        options: PipelineOptions,
        collaborators: impl CollaboratorSet + 'static,
    ) -> Self {
        Self {
            config,
            options,
            collaborators: Box::new(collaborators),
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    // -- Entry points ---------------------------------------------------------

    /// Dispatch on the number of inputs: none is an error, one is processed
    /// on its own, several are merged and then processed.
    pub fn run(&self, inputs: &[DocumentInput], output: &Path) -> Result<RunReport> {
        match inputs {
            [] => Err(ScanmergeError::NoInputs),
            [input] => {
                if input.reverse() {
                    warn!(path = %input.path().display(), "Reverse flag ignored for a single input");
                }
                self.process(input, output)
            }
            _ => self.merge_and_process(inputs, output),
        }
    }

    /// Merge `inputs` into `output` without running any stage.
    pub fn merge(&self, inputs: &[DocumentInput], output: &Path) -> Result<RunReport> {
        self.scoped("merge", |run_id, arena| {
            let merged = self.merge_into(inputs, arena)?;
            self.finish(run_id, &merged, output, StageRun::untouched(&merged))
        })
    }

    /// Run the enabled stages on a single document.
    pub fn process(&self, input: &DocumentInput, output: &Path) -> Result<RunReport> {
        self.scoped("process", |run_id, arena| {
            let run = self.runner().run(input.path(), arena);
            self.finish(run_id, input.path(), output, run)
        })
    }

    /// Merge `inputs` into a scratch document, then run the enabled stages on
    /// it.
    pub fn merge_and_process(&self, inputs: &[DocumentInput], output: &Path) -> Result<RunReport> {
        self.scoped("merge-and-process", |run_id, arena| {
            let merged = self.merge_into(inputs, arena)?;
            let run = self.runner().run(&merged, arena);
            self.finish(run_id, &merged, output, run)
        })
    }

    // -- Internals ------------------------------------------------------------

    fn runner(&self) -> StageRunner<'_> {
        StageRunner::new(&self.config, self.collaborators.as_ref())
    }

    /// Open a run span and an arena, run `body`, and tear both down.
    fn scoped<F>(&self, operation: &'static str, body: F) -> Result<RunReport>
    where
        F: FnOnce(RunId, &mut ScratchArena) -> Result<RunReport>,
    {
        let run_id = RunId::new();
        let span = info_span!("run", %run_id, operation);
        let _entered = span.enter();

        let mut arena = match &self.options.scratch_dir {
            Some(dir) => ScratchArena::new(dir),
            None => ScratchArena::in_temp_dir(),
        };
        let result = body(run_id, &mut arena);
        arena.cleanup_all();

        if let Err(err) = &result {
            warn!(%err, "Run failed");
        }
        result
    }

    fn merge_into(&self, inputs: &[DocumentInput], arena: &mut ScratchArena) -> Result<PathBuf> {
        if inputs.is_empty() {
            return Err(ScanmergeError::NoInputs);
        }
        let merged = arena
            .allocate("merge")
            .map_err(|err| ScanmergeError::MergeFailed(format!("no scratch space: {}", err)))?;
        merge_documents(inputs, self.options.merge_mode, &merged)?;
        Ok(merged)
    }

    /// Commit the run's working document and build the report.
    fn finish(&self, run_id: RunId, start: &Path, output: &Path, run: StageRun) -> Result<RunReport> {
        let bytes = commit(&run.working, output)?;
        let page_count = match PdfReader::from_bytes(&bytes) {
            Ok(reader) => reader.page_count(),
            Err(err) => {
                warn!(%err, "Committed document could not be re-read, page count unknown");
                0
            }
        };

        let report = RunReport {
            run_id,
            output: output.to_path_buf(),
            page_count,
            sha256: hash_bytes(&bytes),
            removed_pages: run.removed_pages,
            stages: run.stages,
        };
        let skipped = report.skipped().count();
        info!(
            output = %output.display(),
            pages = page_count,
            applied = report.stages.len() - skipped,
            skipped,
            changed = run.working != start,
            "Run complete"
        );
        Ok(report)
    }
}
