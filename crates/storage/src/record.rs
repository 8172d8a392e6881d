use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length, in characters, of a trace's input summary.
pub const INPUT_SUMMARY_LIMIT: usize = 500;

/// One stage invocation as recorded by a `RunLogger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// 1-based position of this trace within the run.
    pub sequence: u32,
    /// Human-facing name of the component that ran (e.g. "InsightAgent").
    pub agent: String,
    /// Workflow stage name (e.g. "insight").
    pub stage: String,
    /// RFC 3339 timestamp string.
    pub timestamp: String,
    /// Compact JSON of the stage input, truncated to [`INPUT_SUMMARY_LIMIT`].
    pub input_summary: String,
    pub output: Value,
}

/// Outcome classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// An accepted hypothesis reached the report.
    Success,
    /// A stage failed and the circuit breaker routed straight to the report.
    Failed,
    /// The report was reached without an accepted validation.
    Unvalidated,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "Success",
            RunStatus::Failed => "Failed",
            RunStatus::Unvalidated => "Unvalidated",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The report assembled by the terminal stage and written to disk.
///
/// Fields are declared in output order; `Value` maps serialize with sorted
/// keys, so equal reports always render to equal bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub run_id: String,
    pub status: RunStatus,
    pub final_insight: Value,
    pub validation: Value,
    pub creatives: Value,
    pub retry_count: u32,
    pub error_log: Option<String>,
}

/// Everything recorded about one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// RFC 3339 timestamp string.
    pub started_at: String,
    pub traces: Vec<StageTrace>,
    pub errors: Vec<String>,
    /// None until the run is finalized.
    pub final_report: Option<FinalReport>,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>) -> Self {
        RunRecord {
            run_id: run_id.into(),
            started_at: now_rfc3339(),
            traces: Vec::new(),
            errors: Vec::new(),
            final_report: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.final_report.is_some()
    }

    /// Traces recorded for `stage`, in order.
    pub fn traces_for<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a StageTrace> + 'a {
        self.traces.iter().filter(move |t| t.stage == stage)
    }

    /// Append a trace with the next sequence number and return a copy of it.
    pub(crate) fn push_trace(
        &mut self,
        stage: &str,
        agent: &str,
        input: &Value,
        output: &Value,
    ) -> StageTrace {
        let trace = StageTrace {
            sequence: self.traces.len() as u32 + 1,
            agent: agent.to_string(),
            stage: stage.to_string(),
            timestamp: now_rfc3339(),
            input_summary: summarize_input(input),
            output: output.clone(),
        };
        self.traces.push(trace.clone());
        trace
    }
}

/// Compact JSON rendering of `input`, cut to [`INPUT_SUMMARY_LIMIT`] chars.
pub fn summarize_input(input: &Value) -> String {
    let rendered = match input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match rendered.char_indices().nth(INPUT_SUMMARY_LIMIT) {
        Some((byte_idx, _)) => rendered[..byte_idx].to_string(),
        None => rendered,
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
