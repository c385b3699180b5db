// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the final line a front end prints.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::ScanmergeError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something on this machine got in the way; trying again may work.
    Transient,
    /// The user must change an argument or a file.
    ActionRequired,
    /// The document itself cannot be handled.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether running the same command again could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `ScanmergeError` into a `HumanError`.
pub fn humanize_error(err: &ScanmergeError) -> HumanError {
    match err {
        ScanmergeError::InputNotFound { path } => HumanError {
            message: format!("We couldn't find {}.", path.display()),
            suggestion: "Check the file name and folder, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanmergeError::NoInputs => HumanError {
            message: "No documents were given.".into(),
            suggestion: "Name at least one PDF to process.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanmergeError::MergeFailed(detail) => HumanError {
            message: "The documents could not be combined.".into(),
            suggestion: format!(
                "One of the inputs may be damaged or password protected. Try opening each one on its own. ({detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanmergeError::CommitFailed { path, reason } => HumanError {
            message: format!("The result could not be saved to {}.", path.display()),
            suggestion: format!(
                "Make sure the folder exists, you can write to it, and there is free disk space. ({reason})"
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanmergeError::StageUnavailable { stage } => HumanError {
            message: format!("The {stage} step isn't available on this system."),
            suggestion: "The document was still produced without it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanmergeError::StageFailed { stage, reason } => HumanError {
            message: format!("The {stage} step didn't work on this document."),
            suggestion: format!("The document was still produced without it. ({reason})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanmergeError::PdfError(detail) => HumanError {
            message: "This PDF couldn't be read.".into(),
            suggestion: format!("The file may be damaged. Try re-saving it from the scanner software. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanmergeError::ImageError(detail) => HumanError {
            message: "A scanned page image couldn't be processed.".into(),
            suggestion: format!("Try scanning that page again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanmergeError::OcrError(detail) => HumanError {
            message: "Text recognition didn't work.".into(),
            suggestion: format!("Check that the OCR model files are installed. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanmergeError::Config(detail) => HumanError {
            message: "One of the settings isn't valid.".into(),
            suggestion: format!("Check the options and profile file. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanmergeError::Io(io_err) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check permissions and free disk space. ({io_err})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanmergeError::Serialization(detail) => HumanError {
            message: "The run report couldn't be written.".into(),
            suggestion: format!("This is a bug, please report it. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::StageKind;

    #[test]
    fn missing_input_names_the_file() {
        let human = humanize_error(&ScanmergeError::InputNotFound {
            path: PathBuf::from("evens.pdf"),
        });
        assert!(human.message.contains("evens.pdf"));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn commit_failure_is_retriable() {
        let human = humanize_error(&ScanmergeError::CommitFailed {
            path: PathBuf::from("/readonly/out.pdf"),
            reason: "permission denied".into(),
        });
        assert!(human.retriable);
        assert!(human.suggestion.contains("permission denied"));
    }

    #[test]
    fn stage_errors_reassure_the_user() {
        let human = humanize_error(&ScanmergeError::StageUnavailable {
            stage: StageKind::Ocr,
        });
        assert!(human.message.contains("ocr"));
        assert!(human.suggestion.contains("still produced"));
    }
}
