// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end behaviour of the pipeline: page order after merging, stage
// skipping, commit failures, and scratch cleanup.

mod common;

use std::fs;
use std::path::PathBuf;

use common::{Behaviour, FakeCollaborators, entries, page_widths, write_pdf};
use scanmerge_core::config::{Flag, MergeMode, ProcessingConfig, ProcessingOverrides};
use scanmerge_core::error::ScanmergeError;
use scanmerge_core::types::{DocumentInput, StageKind, StageRecord, StageStatus};
use scanmerge_pipeline::integrity::hash_bytes;
use scanmerge_pipeline::{Pipeline, PipelineOptions, resolve_inputs};
use tempfile::TempDir;

const A: [i64; 3] = [101, 102, 103];
const B: [i64; 3] = [201, 202, 203];

/// A working directory with inputs, an output location, and a scratch
/// directory that should be empty again after every run.
struct Workspace {
    dir: TempDir,
    scratch: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        Self { dir, scratch }
    }

    fn pdf(&self, name: &str, widths: &[i64]) -> PathBuf {
        write_pdf(self.dir.path(), name, widths)
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("result.pdf")
    }

    fn options(&self, merge_mode: MergeMode) -> PipelineOptions {
        PipelineOptions {
            merge_mode,
            scratch_dir: Some(self.scratch.clone()),
        }
    }

    fn pipeline(&self, config: ProcessingConfig, mode: MergeMode, fakes: FakeCollaborators) -> Pipeline {
        Pipeline::with_collaborators(config, self.options(mode), fakes)
    }

    fn duplex_inputs(&self) -> Vec<DocumentInput> {
        let odd = self.pdf("odd.pdf", &A);
        let even = self.pdf("even.pdf", &B);
        resolve_inputs(&[odd, even], &[1]).unwrap()
    }

    fn assert_scratch_empty(&self) {
        assert_eq!(entries(&self.scratch), 0, "scratch artifacts left behind");
    }
}

fn config(overrides: ProcessingOverrides) -> ProcessingConfig {
    overrides.resolve().unwrap()
}

fn statuses(records: &[StageRecord]) -> Vec<(StageKind, StageStatus)> {
    records.iter().map(|record| (record.stage, record.status.clone())).collect()
}

// ---------------------------------------------------------------------------
// Page order
// ---------------------------------------------------------------------------

#[test]
fn concatenation_appends_reversed_input_backwards() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Concatenate, FakeCollaborators::new());

    let report = pipeline.run(&inputs, &ws.output()).unwrap();

    assert_eq!(page_widths(&ws.output()), vec![101, 102, 103, 203, 202, 201]);
    assert_eq!(report.page_count, 6);
    ws.assert_scratch_empty();
}

#[test]
fn interleave_restores_duplex_order() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Interleave, FakeCollaborators::new());

    pipeline.run(&inputs, &ws.output()).unwrap();

    assert_eq!(page_widths(&ws.output()), vec![101, 203, 102, 202, 103, 201]);
    ws.assert_scratch_empty();
}

#[test]
fn ragged_interleave_keeps_every_page() {
    let ws = Workspace::new();
    let short = ws.pdf("short.pdf", &[101, 102]);
    let long = ws.pdf("long.pdf", &B);
    let inputs = resolve_inputs(&[short, long], &[]).unwrap();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Interleave, FakeCollaborators::new());

    let report = pipeline.merge(&inputs, &ws.output()).unwrap();

    assert_eq!(page_widths(&ws.output()), vec![101, 201, 102, 202, 203]);
    assert_eq!(report.page_count, 5);
    assert!(report.stages.is_empty());
}

#[test]
fn lone_input_ignores_its_reverse_flag() {
    let ws = Workspace::new();
    let only = ws.pdf("only.pdf", &A);
    let inputs = resolve_inputs(&[only], &[0]).unwrap();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Concatenate, FakeCollaborators::new());

    pipeline.run(&inputs, &ws.output()).unwrap();

    assert_eq!(page_widths(&ws.output()), A.to_vec());
}

// ---------------------------------------------------------------------------
// Stage runner behaviour
// ---------------------------------------------------------------------------

#[test]
fn no_stages_is_a_passthrough() {
    let ws = Workspace::new();
    let source = ws.pdf("scan.pdf", &A);
    let input = DocumentInput::new(&source, false).unwrap();
    let fakes = FakeCollaborators::new();
    let calls = fakes.calls();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Concatenate, fakes);

    let report = pipeline.process(&input, &ws.output()).unwrap();

    let committed = fs::read(ws.output()).unwrap();
    assert_eq!(committed, fs::read(&source).unwrap());
    assert_eq!(report.page_count, 3);
    assert_eq!(report.sha256, hash_bytes(&committed));
    assert!(report.stages.is_empty());
    assert!(calls.lock().unwrap().is_empty());
    ws.assert_scratch_empty();
}

#[test]
fn unavailable_stage_is_skipped_not_fatal() {
    let ws = Workspace::new();
    let input = DocumentInput::new(ws.pdf("scan.pdf", &A), false).unwrap();
    let fakes = FakeCollaborators::new().with(StageKind::Ocr, Behaviour::Unavailable);
    let calls = fakes.calls();
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            ocr: Flag::On,
            ..Default::default()
        }),
        MergeMode::Concatenate,
        fakes,
    );

    let report = pipeline.process(&input, &ws.output()).unwrap();

    assert_eq!(statuses(&report.stages), vec![(StageKind::Ocr, StageStatus::Unavailable)]);
    assert_eq!(report.skipped().count(), 1);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(page_widths(&ws.output()), A.to_vec());
    ws.assert_scratch_empty();
}

/// The failing stage writes junk into its artifact; the next stage must
/// still be handed the last good document (the fakes refuse unreadable
/// sources).
#[test]
fn failing_stage_does_not_stop_later_stages() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let fakes = FakeCollaborators::new().with(StageKind::Watermark, Behaviour::Fail);
    let calls = fakes.calls();
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            watermark: Some("DRAFT".into()),
            page_numbers: Flag::On,
            title: Some("Minutes".into()),
            ..Default::default()
        }),
        MergeMode::Interleave,
        fakes,
    );

    let report = pipeline.run(&inputs, &ws.output()).unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec![StageKind::Watermark, StageKind::PageNumbers, StageKind::Metadata]
    );
    let recorded = statuses(&report.stages);
    assert!(matches!(
        &recorded[0],
        (StageKind::Watermark, StageStatus::Failed { reason }) if reason.contains("fake failure")
    ));
    assert_eq!(recorded[1], (StageKind::PageNumbers, StageStatus::Applied));
    assert_eq!(recorded[2], (StageKind::Metadata, StageStatus::Applied));
    assert_eq!(page_widths(&ws.output()), vec![101, 203, 102, 202, 103, 201]);
    ws.assert_scratch_empty();
}

#[test]
fn stages_run_in_slot_order() {
    let ws = Workspace::new();
    let input = DocumentInput::new(ws.pdf("scan.pdf", &A), false).unwrap();
    let fakes = FakeCollaborators::new();
    let calls = fakes.calls();
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            keywords: Some("scan".into()),
            page_numbers: Flag::On,
            watermark: Some("COPY".into()),
            optimize: Flag::On,
            ocr: Flag::On,
            lossy: Flag::On,
            despeckle: Flag::On,
            auto_deskew: Flag::On,
            deskew: Flag::On,
            remove_blank: Flag::On,
            ..Default::default()
        }),
        MergeMode::Concatenate,
        fakes,
    );

    pipeline.process(&input, &ws.output()).unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            StageKind::BlankPages,
            StageKind::AutoDeskew,
            StageKind::ImageFilter,
            StageKind::Lossy,
            StageKind::Ocr,
            StageKind::Optimize,
            StageKind::Watermark,
            StageKind::PageNumbers,
            StageKind::Metadata,
        ]
    );
    ws.assert_scratch_empty();
}

#[test]
fn removed_blank_pages_are_reported() {
    let ws = Workspace::new();
    let first = ws.pdf("first.pdf", &A);
    let second = ws.pdf("second.pdf", &B);
    let inputs = resolve_inputs(&[first, second], &[]).unwrap();
    let fakes = FakeCollaborators::new().with(StageKind::BlankPages, Behaviour::DropFirstPage);
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            remove_blank: Flag::On,
            ..Default::default()
        }),
        MergeMode::Concatenate,
        fakes,
    );

    let report = pipeline.run(&inputs, &ws.output()).unwrap();

    assert_eq!(report.removed_pages, vec![0]);
    assert_eq!(report.page_count, 5);
    assert_eq!(page_widths(&ws.output()), vec![102, 103, 201, 202, 203]);
}

#[test]
fn merge_only_runs_no_stage() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let fakes = FakeCollaborators::new();
    let calls = fakes.calls();
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            optimize: Flag::On,
            ..Default::default()
        }),
        MergeMode::Concatenate,
        fakes,
    );

    let report = pipeline.merge(&inputs, &ws.output()).unwrap();

    assert!(report.stages.is_empty());
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(report.page_count, 6);
}

// ---------------------------------------------------------------------------
// Fatal errors and cleanup
// ---------------------------------------------------------------------------

#[test]
fn no_inputs_is_an_error() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline(ProcessingConfig::default(), MergeMode::Concatenate, FakeCollaborators::new());
    assert!(matches!(pipeline.run(&[], &ws.output()), Err(ScanmergeError::NoInputs)));
}

#[test]
fn unreadable_input_fails_merge_and_cleans_up() {
    let ws = Workspace::new();
    let good = ws.pdf("good.pdf", &A);
    let bad = ws.dir.path().join("bad.pdf");
    fs::write(&bad, b"not a pdf at all").unwrap();
    let inputs = resolve_inputs(&[good, bad], &[]).unwrap();
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            ocr: Flag::On,
            ..Default::default()
        }),
        MergeMode::Concatenate,
        FakeCollaborators::new(),
    );

    let err = pipeline.run(&inputs, &ws.output()).unwrap_err();

    assert!(matches!(err, ScanmergeError::MergeFailed(_)));
    assert!(!ws.output().exists());
    ws.assert_scratch_empty();
}

#[test]
fn commit_failure_is_fatal_and_cleans_up() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let output = ws.dir.path().join("missing-dir").join("result.pdf");
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            page_numbers: Flag::On,
            ..Default::default()
        }),
        MergeMode::Interleave,
        FakeCollaborators::new(),
    );

    let err = pipeline.run(&inputs, &output).unwrap_err();

    assert!(matches!(err, ScanmergeError::CommitFailed { ref path, .. } if *path == output));
    ws.assert_scratch_empty();
}

#[test]
fn scratch_is_empty_after_every_kind_of_run() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let everything_fails = [
        StageKind::BlankPages,
        StageKind::BasicDeskew,
        StageKind::Watermark,
        StageKind::Metadata,
    ]
    .into_iter()
    .fold(FakeCollaborators::new(), |fakes, kind| fakes.with(kind, Behaviour::Fail));
    let pipeline = ws.pipeline(
        config(ProcessingOverrides {
            remove_blank: Flag::On,
            deskew: Flag::On,
            watermark: Some("X".into()),
            author: Some("Scanner".into()),
            ..Default::default()
        }),
        MergeMode::Interleave,
        everything_fails,
    );

    let report = pipeline.merge_and_process(&inputs, &ws.output()).unwrap();
    assert_eq!(report.skipped().count(), 4);
    ws.assert_scratch_empty();

    pipeline.merge(&inputs, &ws.output()).unwrap();
    ws.assert_scratch_empty();

    pipeline.process(&inputs[0], &ws.output()).unwrap();
    ws.assert_scratch_empty();
}

#[test]
fn missing_input_is_reported_before_anything_runs() {
    let ws = Workspace::new();
    let present = ws.pdf("present.pdf", &A);
    let missing = ws.dir.path().join("missing.pdf");

    let err = resolve_inputs(&[present, missing.clone()], &[]).unwrap_err();

    assert!(matches!(err, ScanmergeError::InputNotFound { ref path } if *path == missing));
    assert!(!ws.output().exists());
}

// ---------------------------------------------------------------------------
// Built-in collaborators
// ---------------------------------------------------------------------------

#[test]
fn default_collaborators_number_pages_and_write_metadata() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let pipeline = Pipeline::new(
        config(ProcessingOverrides {
            page_numbers: Flag::On,
            title: Some("Board minutes".into()),
            ..Default::default()
        }),
        ws.options(MergeMode::Interleave),
    );

    let report = pipeline.run(&inputs, &ws.output()).unwrap();

    assert!(report.stages.iter().all(|record| record.status == StageStatus::Applied));
    let doc = lopdf::Document::load(ws.output()).unwrap();
    for (index, page_id) in doc.get_pages().into_values().enumerate() {
        let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
        assert!(content.contains(&format!("({}) Tj", index + 1)), "{content}");
    }
    let info_id = doc.trailer.get(b"Info").and_then(lopdf::Object::as_reference).unwrap();
    let title = doc.get_dictionary(info_id).unwrap().get(b"Title").and_then(lopdf::Object::as_str).unwrap();
    assert_eq!(title, b"Board minutes");
    assert_eq!(page_widths(&ws.output()), vec![101, 203, 102, 202, 103, 201]);
    ws.assert_scratch_empty();
}


#[test]
fn pipeline_runs_on_a_worker_thread() {
    let ws = Workspace::new();
    let inputs = ws.duplex_inputs();
    let output = ws.output();
    let pipeline = Pipeline::new(
        config(ProcessingOverrides {
            title: Some("Board minutes".into()),
            ..Default::default()
        }),
        ws.options(MergeMode::Interleave),
    );

    let report = std::thread::spawn(move || pipeline.run(&inputs, &output))
        .join()
        .unwrap()
        .unwrap();

    assert_eq!(report.page_count, 6);
    assert_eq!(page_widths(&ws.output()), vec![101, 203, 102, 202, 103, 201]);
    ws.assert_scratch_empty();
}
