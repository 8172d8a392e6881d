//! Conformance test suite for `RunLogger` implementations.
//!
//! Any backend can run [`run_conformance_suite`] with a factory that returns
//! a fresh logger for each check:
//!
//! ```ignore
//! use adpulse_storage::conformance::run_conformance_suite;
//!
//! let report = run_conformance_suite(|| Box::new(MemoryRunLogger::new()));
//! assert!(report.is_clean(), "{report}");
//! ```

use std::fmt;

use serde_json::json;

use crate::error::StorageError;
use crate::record::{FinalReport, RunStatus, INPUT_SUMMARY_LIMIT};
use crate::traits::RunLogger;

/// A check that did not hold for the logger under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub check: &'static str,
    pub message: String,
}

/// Outcome of [`run_conformance_suite`].
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub checks_run: usize,
    pub failures: Vec<CheckFailure>,
}

impl ConformanceReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run logger: {} of {} checks hold",
            self.checks_run - self.failures.len(),
            self.checks_run
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.check, failure.message)?;
        }
        Ok(())
    }
}

type Check = fn(&mut dyn RunLogger) -> Result<(), String>;

const CHECKS: &[(&str, Check)] = &[
    ("run_id_is_stable", run_id_is_stable),
    ("sequences_are_contiguous", sequences_are_contiguous),
    ("trace_preserves_stage_and_output", trace_preserves_stage_and_output),
    ("input_summary_is_truncated", input_summary_is_truncated),
    ("errors_are_kept_in_order", errors_are_kept_in_order),
    ("finalize_returns_full_record", finalize_returns_full_record),
    ("finalized_run_rejects_steps", finalized_run_rejects_steps),
    ("finalize_twice_is_rejected", finalize_twice_is_rejected),
];

/// Run every check against a fresh logger from `factory`.
pub fn run_conformance_suite<F>(factory: F) -> ConformanceReport
where
    F: Fn() -> Box<dyn RunLogger>,
{
    let mut report = ConformanceReport::default();
    for &(check, run) in CHECKS {
        let mut logger = factory();
        report.checks_run += 1;
        if let Err(message) = run(&mut *logger) {
            report.failures.push(CheckFailure { check, message });
        }
    }
    report
}

// ── Checks ───────────────────────────────────────────────────────────────────

fn sample_report(run_id: &str) -> FinalReport {
    FinalReport {
        run_id: run_id.to_string(),
        status: RunStatus::Failed,
        final_insight: json!(null),
        validation: json!(null),
        creatives: json!(null),
        retry_count: 0,
        error_log: Some("CRITICAL FAILURE: test".to_string()),
    }
}

fn storage(e: StorageError) -> String {
    format!("unexpected storage error: {e}")
}

fn run_id_is_stable(logger: &mut dyn RunLogger) -> Result<(), String> {
    let id = logger.run_id().to_string();
    if id.is_empty() {
        return Err("run id is empty".into());
    }
    logger
        .log_step("data", "DataAgent", &json!(null), &json!({}))
        .map_err(storage)?;
    if logger.run_id() != id || logger.record().run_id != id {
        return Err(format!("run id changed from {id}"));
    }
    Ok(())
}

fn sequences_are_contiguous(logger: &mut dyn RunLogger) -> Result<(), String> {
    for stage in ["data", "insight", "evaluator", "insight", "evaluator"] {
        logger
            .log_step(stage, "Agent", &json!(stage), &json!({}))
            .map_err(storage)?;
    }
    let seqs: Vec<u32> = logger.record().traces.iter().map(|t| t.sequence).collect();
    if seqs != [1, 2, 3, 4, 5] {
        return Err(format!("expected sequences 1..=5, got {seqs:?}"));
    }
    Ok(())
}

fn trace_preserves_stage_and_output(logger: &mut dyn RunLogger) -> Result<(), String> {
    let output = json!({"is_valid": false, "critique": "needs evidence"});
    let trace = logger
        .log_step("evaluator", "EvaluatorAgent", &json!({"h": 1}), &output)
        .map_err(storage)?;
    if trace.stage != "evaluator" || trace.agent != "EvaluatorAgent" {
        return Err(format!("wrong labels: {}/{}", trace.stage, trace.agent));
    }
    if trace.output != output {
        return Err("output not preserved".into());
    }
    if trace.input_summary != r#"{"h":1}"# {
        return Err(format!("unexpected input summary {:?}", trace.input_summary));
    }
    if logger.record().traces.last() != Some(&trace) {
        return Err("returned trace differs from stored trace".into());
    }
    Ok(())
}

fn input_summary_is_truncated(logger: &mut dyn RunLogger) -> Result<(), String> {
    let input = json!("x".repeat(INPUT_SUMMARY_LIMIT * 2));
    let trace = logger
        .log_step("data", "DataAgent", &input, &json!({}))
        .map_err(storage)?;
    let len = trace.input_summary.chars().count();
    if len != INPUT_SUMMARY_LIMIT {
        return Err(format!("summary has {len} chars"));
    }
    Ok(())
}

fn errors_are_kept_in_order(logger: &mut dyn RunLogger) -> Result<(), String> {
    logger.log_error("first").map_err(storage)?;
    logger.log_error("second").map_err(storage)?;
    if logger.record().errors != ["first", "second"] {
        return Err(format!("errors: {:?}", logger.record().errors));
    }
    Ok(())
}

fn finalize_returns_full_record(logger: &mut dyn RunLogger) -> Result<(), String> {
    logger
        .log_step("data", "DataAgent", &json!(null), &json!({}))
        .map_err(storage)?;
    let report = sample_report(logger.run_id());
    let record = logger.finalize(&report).map_err(storage)?;
    if record.final_report.as_ref() != Some(&report) {
        return Err("final report missing from record".into());
    }
    if record.traces.len() != 1 {
        return Err(format!("expected 1 trace, got {}", record.traces.len()));
    }
    if !logger.record().is_finalized() {
        return Err("logger record not marked finalized".into());
    }
    Ok(())
}

fn finalized_run_rejects_steps(logger: &mut dyn RunLogger) -> Result<(), String> {
    let report = sample_report(logger.run_id());
    logger.finalize(&report).map_err(storage)?;
    match logger.log_step("data", "DataAgent", &json!(null), &json!({})) {
        Err(StorageError::AlreadyFinalized { .. }) => {}
        other => return Err(format!("expected AlreadyFinalized, got {other:?}")),
    }
    match logger.log_error("late") {
        Err(StorageError::AlreadyFinalized { .. }) => {}
        other => return Err(format!("expected AlreadyFinalized, got {other:?}")),
    }
    if !logger.record().traces.is_empty() || !logger.record().errors.is_empty() {
        return Err("finalized record was mutated".into());
    }
    Ok(())
}

fn finalize_twice_is_rejected(logger: &mut dyn RunLogger) -> Result<(), String> {
    let report = sample_report(logger.run_id());
    logger.finalize(&report).map_err(storage)?;
    match logger.finalize(&report) {
        Err(StorageError::AlreadyFinalized { run_id }) if run_id == logger.run_id() => Ok(()),
        other => Err(format!("expected AlreadyFinalized, got {other:?}")),
    }
}
