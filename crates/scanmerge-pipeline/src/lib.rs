// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanmerge-pipeline — Orchestration for the Scanmerge pipeline.
//
// Resolves declared inputs, merges them into one working document, threads
// that document through the enabled stages (skipping any stage that is
// unavailable or fails), commits the result, and removes every scratch file
// the run created.

pub mod artifacts;
pub mod integrity;
pub mod merge;
pub mod pipeline;
pub mod resolver;
pub mod runner;

pub use artifacts::ScratchArena;
pub use merge::{PageRef, PageSource, merge_documents, page_order};
pub use pipeline::{Pipeline, PipelineOptions};
pub use resolver::resolve_inputs;
pub use runner::{StageRun, StageRunner, commit};
