// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanmerge — merge, interleave, and clean up scanned PDF documents.
//
// Logs go to stderr; stdout carries only the result (a summary, the JSON
// report, or the profile list). Exit status is 0 on success and 1 on any
// fatal error.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use scanmerge_cli::{Cli, Outcome, execute, summary};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::human_errors::humanize_error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match execute(&cli).and_then(|outcome| print_outcome(&cli, &outcome)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Run failed");
            match err.downcast_ref::<ScanmergeError>() {
                Some(scan_err) => eprintln!("error: {}", humanize_error(scan_err)),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn print_outcome(cli: &Cli, outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Profiles(names) => {
            for name in names {
                println!("{name}");
            }
        }
        Outcome::Report(report) if cli.json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        Outcome::Report(report) => {
            if !cli.quiet {
                println!("{}", summary(report));
            }
        }
    }
    Ok(())
}
