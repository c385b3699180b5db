// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator contract between the stage runner and the transformations.
//
// The runner only knows two things about a stage: whether it can run right
// now, and how to turn one document file into another. Everything
// stage-specific (parameters, libraries, models) lives behind these traits.

use std::path::Path;

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::types::{StageKind, StageOutcome};

/// A single transformation stage.
///
/// Stages are `Send + Sync` so a configured pipeline can be handed to a
/// worker thread.
pub trait Collaborator: Send + Sync {
    /// Which slot this collaborator fills.
    fn kind(&self) -> StageKind;

    /// Whether the runtime dependencies of this stage are present.
    fn is_available(&self) -> bool;

    /// Read the whole of `source` and write a complete document to `dest`.
    ///
    /// On error, `dest` must not hold anything a caller could mistake for a
    /// finished document; the runner discards it either way.
    fn apply(&self, source: &Path, dest: &Path) -> Result<StageOutcome>;
}

/// Hands out the collaborator for each stage, parameterised from the
/// configuration.
pub trait CollaboratorSet: Send + Sync {
    fn collaborator(&self, kind: StageKind, config: &ProcessingConfig) -> Box<dyn Collaborator>;
}
