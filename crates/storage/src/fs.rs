//! File-backed run logger.
//!
//! Layout of one run:
//!
//! ```text
//! <logs_dir>/run_<run_id>/
//!     01_DataAgent_142501.json
//!     02_InsightAgent_142502.json
//!     ...
//!     execution.jsonl
//!     run_record.json
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use time::macros::format_description;

use crate::error::StorageError;
use crate::record::{now_rfc3339, FinalReport, RunRecord, StageTrace};
use crate::sink::write_atomic;
use crate::traits::RunLogger;

/// Name of the JSON-lines timeline inside a run directory.
pub const TIMELINE_FILE: &str = "execution.jsonl";
/// Name of the sealed run record inside a run directory.
pub const RUN_RECORD_FILE: &str = "run_record.json";

/// First 8 hex characters of a fresh v4 UUID.
pub fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn clock_hhmmss() -> String {
    time::OffsetDateTime::now_utc()
        .format(format_description!("[hour][minute][second]"))
        .unwrap_or_else(|_| "000000".to_string())
}

/// Trace file name for the `sequence`-th step run by `agent`.
pub fn trace_file_name(sequence: u32, agent: &str, hhmmss: &str) -> String {
    format!("{sequence:02}_{agent}_{hhmmss}.json")
}

/// A `RunLogger` writing each run into its own directory.
#[derive(Debug)]
pub struct FsRunLogger {
    dir: PathBuf,
    record: RunRecord,
}

impl FsRunLogger {
    /// Create `<logs_dir>/run_<id>` for a freshly generated run id.
    pub fn create(logs_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::create_with_id(logs_dir, new_run_id())
    }

    pub fn create_with_id(
        logs_dir: impl AsRef<Path>,
        run_id: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let run_id = run_id.into();
        let dir = logs_dir.as_ref().join(format!("run_{run_id}"));
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        tracing::info!(run_id = %run_id, dir = %dir.display(), "run directory created");

        let logger = FsRunLogger {
            dir,
            record: RunRecord::new(run_id),
        };
        logger.append_timeline(&json!({
            "event": "start",
            "run_id": logger.record.run_id,
            "timestamp": logger.record.started_at,
        }))?;
        Ok(logger)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.record.is_finalized() {
            return Err(StorageError::AlreadyFinalized {
                run_id: self.record.run_id.clone(),
            });
        }
        Ok(())
    }

    fn append_timeline(&self, event: &Value) -> Result<(), StorageError> {
        let path = self.dir.join(TIMELINE_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        writeln!(file, "{event}").map_err(|e| StorageError::io(&path, e))
    }
}

impl RunLogger for FsRunLogger {
    fn run_id(&self) -> &str {
        &self.record.run_id
    }

    fn run_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }

    fn log_step(
        &mut self,
        stage: &str,
        agent: &str,
        input: &Value,
        output: &Value,
    ) -> Result<StageTrace, StorageError> {
        self.ensure_open()?;
        let trace = self.record.push_trace(stage, agent, input, output);

        let path = self
            .dir
            .join(trace_file_name(trace.sequence, agent, &clock_hhmmss()));
        let body = serde_json::to_string_pretty(&trace)
            .map_err(|e| StorageError::serialize("stage trace", e))?;
        fs::write(&path, body).map_err(|e| StorageError::io(&path, e))?;

        self.append_timeline(&json!({
            "event": "step",
            "sequence": trace.sequence,
            "stage": trace.stage,
            "agent": trace.agent,
            "timestamp": trace.timestamp,
        }))?;
        tracing::debug!(sequence = trace.sequence, agent, path = %path.display(), "trace written");
        Ok(trace)
    }

    fn log_error(&mut self, message: &str) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.record.errors.push(message.to_string());
        tracing::error!(run_id = %self.record.run_id, "{message}");
        self.append_timeline(&json!({
            "event": "error",
            "message": message,
            "timestamp": now_rfc3339(),
        }))
    }

    fn finalize(&mut self, report: &FinalReport) -> Result<RunRecord, StorageError> {
        self.ensure_open()?;
        self.record.final_report = Some(report.clone());

        let path = self.dir.join(RUN_RECORD_FILE);
        let body = serde_json::to_string_pretty(&self.record)
            .map_err(|e| StorageError::serialize("run record", e))?;
        write_atomic(&path, body.as_bytes())?;

        self.append_timeline(&json!({
            "event": "finalize",
            "status": report.status,
            "timestamp": now_rfc3339(),
        }))?;
        Ok(self.record.clone())
    }

    fn record(&self) -> &RunRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;
    use crate::record::RunStatus;
    use tempfile::TempDir;

    fn report(run_id: &str) -> FinalReport {
        FinalReport {
            run_id: run_id.to_string(),
            status: RunStatus::Success,
            final_insight: json!({"primary_driver": "ctr"}),
            validation: json!({"is_valid": true, "critique": ""}),
            creatives: json!([]),
            retry_count: 0,
            error_log: None,
        }
    }

    #[test]
    fn run_ids_are_eight_hex_chars() {
        let id = new_run_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_run_id());
    }

    #[test]
    fn trace_file_names_are_zero_padded() {
        assert_eq!(
            trace_file_name(3, "EvaluatorAgent", "091500"),
            "03_EvaluatorAgent_091500.json"
        );
    }

    #[test]
    fn writes_traces_timeline_and_record() {
        let tmp = TempDir::new().unwrap();
        let mut logger = FsRunLogger::create_with_id(tmp.path(), "cafe0001").unwrap();
        assert_eq!(logger.dir(), tmp.path().join("run_cafe0001"));

        logger
            .log_step("data", "DataAgent", &json!("why"), &json!({"ok": true}))
            .unwrap();
        logger
            .log_step("insight", "InsightAgent", &json!({"q": 1}), &json!({}))
            .unwrap();
        logger.log_error("boom").unwrap();
        logger.finalize(&report("cafe0001")).unwrap();

        let mut names: Vec<String> = fs::read_dir(logger.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 4);
        assert!(names[0].starts_with("01_DataAgent_"));
        assert!(names[1].starts_with("02_InsightAgent_"));
        assert_eq!(names[2], TIMELINE_FILE);
        assert_eq!(names[3], RUN_RECORD_FILE);

        let timeline = fs::read_to_string(logger.dir().join(TIMELINE_FILE)).unwrap();
        let events: Vec<Value> = timeline
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(kinds, ["start", "step", "step", "error", "finalize"]);

        let sealed: RunRecord =
            serde_json::from_str(&fs::read_to_string(logger.dir().join(RUN_RECORD_FILE)).unwrap())
                .unwrap();
        assert_eq!(sealed.traces.len(), 2);
        assert_eq!(sealed.errors, ["boom"]);
        assert_eq!(sealed.final_report.unwrap().status, RunStatus::Success);
    }

    #[test]
    fn fs_logger_conformance() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let report = run_conformance_suite(move || {
            Box::new(FsRunLogger::create(&root).expect("create run dir"))
        });
        assert!(report.is_clean(), "{report}");
    }
}
