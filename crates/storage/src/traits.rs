use std::path::Path;

use serde_json::Value;

use crate::error::StorageError;
use crate::record::{FinalReport, RunRecord, StageTrace};

/// Persistence for one workflow run.
///
/// A logger is created by the caller before the run starts and handed to the
/// orchestrator, which records one trace per stage invocation and seals the
/// run with the final report.
///
/// ## Lifecycle
///
/// 1. `log_step` / `log_error` any number of times, in execution order
/// 2. `finalize(report)` exactly once
///
/// After `finalize`, every mutating method returns
/// `Err(StorageError::AlreadyFinalized { .. })` and the record is unchanged.
pub trait RunLogger: Send {
    /// Short identifier of this run.
    fn run_id(&self) -> &str;

    /// Directory holding this run's artifacts, if the logger writes to disk.
    fn run_dir(&self) -> Option<&Path> {
        None
    }

    /// Record one stage invocation and return the stored trace.
    fn log_step(
        &mut self,
        stage: &str,
        agent: &str,
        input: &Value,
        output: &Value,
    ) -> Result<StageTrace, StorageError>;

    /// Record a run-level error message.
    fn log_error(&mut self, message: &str) -> Result<(), StorageError>;

    /// Seal the run with its final report.
    fn finalize(&mut self, report: &FinalReport) -> Result<RunRecord, StorageError>;

    /// Everything recorded so far.
    fn record(&self) -> &RunRecord;
}
