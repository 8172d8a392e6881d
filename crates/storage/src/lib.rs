//! Run persistence for adpulse workflows: the `RunLogger` trait with file
//! and in-memory implementations, the run records they produce, and the
//! report sink that publishes the final report.

pub mod conformance;
mod error;
mod fs;
mod memory;
mod record;
mod sink;
mod traits;

pub use error::StorageError;
pub use fs::{new_run_id, trace_file_name, FsRunLogger, RUN_RECORD_FILE, TIMELINE_FILE};
pub use memory::MemoryRunLogger;
pub use record::{
    summarize_input, FinalReport, RunRecord, RunStatus, StageTrace, INPUT_SUMMARY_LIMIT,
};
pub use sink::{render_report, write_atomic, ReportSink, REPORT_FILE};
pub use traits::RunLogger;
