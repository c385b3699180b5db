// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named processing profiles.
//
// The built-in profiles ship inside the binary. A user file (YAML, TOML, or
// JSON, chosen by extension) is layered on top: new names add profiles, and
// keys under an existing name override that profile's keys.

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, File, FileFormat};
use scanmerge_core::config::ProcessingOverrides;
use scanmerge_core::error::{Result, ScanmergeError};
use tracing::debug;

const BUILT_IN_PROFILES: &str = include_str!("../profiles.yaml");

#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    profiles: BTreeMap<String, ProcessingOverrides>,
}

impl ProfileBook {
    pub fn built_in() -> Result<Self> {
        Self::load(None)
    }

    /// Built-in profiles, extended by `user_file` when given.
    pub fn load(user_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from_str(BUILT_IN_PROFILES, FileFormat::Yaml));
        if let Some(path) = user_file {
            if !path.is_file() {
                return Err(ScanmergeError::Config(format!(
                    "profile file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        let profiles: BTreeMap<String, ProcessingOverrides> = builder
            .build()
            .map_err(|err| ScanmergeError::Config(format!("cannot read profiles: {}", err)))?
            .try_deserialize()
            .map_err(|err| ScanmergeError::Config(format!("invalid profile: {}", err)))?;

        debug!(count = profiles.len(), "Profiles loaded");
        Ok(Self { profiles })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&ProcessingOverrides> {
        self.profiles.get(name).ok_or_else(|| {
            ScanmergeError::Config(format!(
                "unknown profile '{}' (available: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}
