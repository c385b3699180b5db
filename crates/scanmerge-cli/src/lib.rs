// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanmerge-cli — Command-line front end for the Scanmerge pipeline.
//
// Turns parsed arguments into a resolved configuration and a list of inputs,
// runs the pipeline once, and renders the outcome for the terminal.

pub mod args;
pub mod profile;

use std::fmt::Write as _;

use scanmerge_core::config::{ProcessingConfig, ProcessingOverrides};
use scanmerge_core::error::{Result, ScanmergeError};
use scanmerge_core::types::{RunReport, StageStatus};
use scanmerge_document::DocumentCollaborators;
use scanmerge_document::scan::OcrConfig;
use scanmerge_pipeline::{Pipeline, PipelineOptions, resolve_inputs};
use tracing::{debug, info};

pub use args::Cli;
pub use profile::ProfileBook;

/// What a successful invocation produced.
#[derive(Debug)]
pub enum Outcome {
    Profiles(Vec<String>),
    Report(RunReport),
}

/// Command-line options layered over the selected profile (if any) and
/// resolved against the defaults.
pub fn processing_config(cli: &Cli, profiles: &ProfileBook) -> Result<ProcessingConfig> {
    let base = match &cli.profile {
        Some(name) => {
            debug!(profile = %name, "Applying profile");
            profiles.get(name)?.clone()
        }
        None => ProcessingOverrides::default(),
    };
    cli.overrides().layered_over(&base).resolve()
}

/// Run the command described by `cli`.
pub fn execute(cli: &Cli) -> anyhow::Result<Outcome> {
    let profiles = ProfileBook::load(cli.profile_file.as_deref())?;
    if cli.list_profiles {
        return Ok(Outcome::Profiles(profiles.names().map(str::to_owned).collect()));
    }

    let output = cli
        .output
        .as_deref()
        .ok_or_else(|| ScanmergeError::Config("an output file is required (-o)".into()))?;
    let config = processing_config(cli, &profiles)?;
    let inputs = resolve_inputs(&cli.inputs, &cli.reverse_pdfs)?;

    let mut collaborators = DocumentCollaborators::new();
    if let Some(dir) = &cli.ocr_models {
        collaborators = collaborators.with_ocr_models(OcrConfig::from_dir(dir));
    }
    let options = PipelineOptions {
        merge_mode: cli.merge_mode(),
        scratch_dir: cli.scratch_dir.clone(),
    };

    info!(
        inputs = inputs.len(),
        stages = config.enabled_stages().len(),
        output = %output.display(),
        "Starting"
    );
    let report = Pipeline::with_collaborators(config, options, collaborators).run(&inputs, output)?;
    Ok(Outcome::Report(report))
}

/// Plain-text summary of a finished run.
pub fn summary(report: &RunReport) -> String {
    let mut text = format!(
        "Wrote {} ({} page{})",
        report.output.display(),
        report.page_count,
        if report.page_count == 1 { "" } else { "s" }
    );
    if !report.removed_pages.is_empty() {
        let _ = write!(text, ", removed {} blank", report.removed_pages.len());
    }
    for record in report.skipped() {
        match &record.status {
            StageStatus::Unavailable => {
                let _ = write!(text, "\n  skipped {}: not available", record.stage);
            }
            StageStatus::Failed { reason } => {
                let _ = write!(text, "\n  skipped {}: {}", record.stage, reason);
            }
            StageStatus::Applied => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use scanmerge_core::config::Flag;
    use scanmerge_core::types::{RunId, StageKind, StageRecord};

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("scanmerge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_line_beats_profile() {
        let profiles = ProfileBook::built_in().unwrap();
        let cli = parse(&["in.pdf", "-o", "out.pdf", "--profile", "document", "--no-ocr", "--title", "Minutes"]);

        let config = processing_config(&cli, &profiles).unwrap();

        let stages = config.enabled_stages();
        assert!(!stages.contains(&StageKind::Ocr));
        assert!(stages.contains(&StageKind::BlankPages));
        assert!(stages.contains(&StageKind::Metadata));
        assert_eq!(config.optimize.compress_level, 6);
    }

    #[test]
    fn no_profile_means_defaults() {
        let profiles = ProfileBook::built_in().unwrap();
        let cli = parse(&["in.pdf", "-o", "out.pdf"]);
        let config = processing_config(&cli, &profiles).unwrap();
        assert!(config.enabled_stages().is_empty());
        assert_eq!(cli.overrides().ocr, Flag::Unset);
    }

    #[test]
    fn unknown_profile_is_a_config_error() {
        let profiles = ProfileBook::built_in().unwrap();
        let cli = parse(&["in.pdf", "-o", "out.pdf", "--profile", "poster"]);
        assert!(matches!(processing_config(&cli, &profiles), Err(ScanmergeError::Config(_))));
    }

    #[test]
    fn summary_lists_skipped_stages() {
        let report = RunReport {
            run_id: RunId::new(),
            output: PathBuf::from("out.pdf"),
            page_count: 3,
            sha256: String::new(),
            removed_pages: vec![4],
            stages: vec![
                StageRecord { stage: StageKind::BlankPages, status: StageStatus::Applied },
                StageRecord { stage: StageKind::Ocr, status: StageStatus::Unavailable },
                StageRecord {
                    stage: StageKind::Watermark,
                    status: StageStatus::Failed { reason: "bad font".into() },
                },
            ],
        };

        let text = summary(&report);

        assert!(text.starts_with("Wrote out.pdf (3 pages), removed 1 blank"));
        assert!(text.contains("skipped ocr: not available"));
        assert!(text.contains("skipped watermark: bad font"));
        assert!(!text.contains("blank-pages"));
    }
}
