use serde_json::Value;

use crate::error::StorageError;
use crate::fs::new_run_id;
use crate::record::{FinalReport, RunRecord, StageTrace};
use crate::traits::RunLogger;

/// A `RunLogger` that keeps the run record in memory only.
#[derive(Debug, Clone)]
pub struct MemoryRunLogger {
    record: RunRecord,
}

impl MemoryRunLogger {
    pub fn new() -> Self {
        Self::with_run_id(new_run_id())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        MemoryRunLogger {
            record: RunRecord::new(run_id),
        }
    }

    pub fn into_record(self) -> RunRecord {
        self.record
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.record.is_finalized() {
            return Err(StorageError::AlreadyFinalized {
                run_id: self.record.run_id.clone(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryRunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLogger for MemoryRunLogger {
    fn run_id(&self) -> &str {
        &self.record.run_id
    }

    fn log_step(
        &mut self,
        stage: &str,
        agent: &str,
        input: &Value,
        output: &Value,
    ) -> Result<StageTrace, StorageError> {
        self.ensure_open()?;
        Ok(self.record.push_trace(stage, agent, input, output))
    }

    fn log_error(&mut self, message: &str) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.record.errors.push(message.to_string());
        Ok(())
    }

    fn finalize(&mut self, report: &FinalReport) -> Result<RunRecord, StorageError> {
        self.ensure_open()?;
        self.record.final_report = Some(report.clone());
        Ok(self.record.clone())
    }

    fn record(&self) -> &RunRecord {
        &self.record
    }
}
