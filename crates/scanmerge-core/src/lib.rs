// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanmerge — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod stage;
pub mod types;

pub use config::{Flag, MergeMode, PageNumberPosition, ProcessingConfig, ProcessingOverrides};
pub use error::ScanmergeError;
pub use stage::{Collaborator, CollaboratorSet};
pub use types::*;
