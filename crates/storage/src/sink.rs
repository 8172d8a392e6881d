use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::record::FinalReport;

/// File name of the report inside a run directory.
pub const REPORT_FILE: &str = "final_report.json";

/// Render `report` as 2-space indented JSON with a trailing newline.
pub fn render_report(report: &FinalReport) -> Result<String, StorageError> {
    let mut body = serde_json::to_string_pretty(report)
        .map_err(|e| StorageError::serialize("final report", e))?;
    body.push('\n');
    Ok(body)
}

/// Write `bytes` to a sibling temporary file, then rename it over `path`.
///
/// Parent directories are created as needed. Readers of `path` observe
/// either the previous content or the new content, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StorageError::io(path, e)
    })
}

/// Destinations for the final report.
#[derive(Debug, Clone, Default)]
pub struct ReportSink {
    shared_path: Option<PathBuf>,
}

impl ReportSink {
    /// Sink writing to the run directory and to `shared_path`.
    pub fn new(shared_path: impl Into<PathBuf>) -> Self {
        ReportSink {
            shared_path: Some(shared_path.into()),
        }
    }

    /// Sink with no shared path; only the run directory (if any) is written.
    pub fn run_dir_only() -> Self {
        ReportSink { shared_path: None }
    }

    pub fn shared_path(&self) -> Option<&Path> {
        self.shared_path.as_deref()
    }

    /// Persist `report` to every destination and return the paths written.
    pub fn persist(
        &self,
        report: &FinalReport,
        run_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let body = render_report(report)?;
        let targets: Vec<PathBuf> = run_dir
            .map(|dir| dir.join(REPORT_FILE))
            .into_iter()
            .chain(self.shared_path.clone())
            .collect();

        for path in &targets {
            write_atomic(path, body.as_bytes())?;
            tracing::info!(path = %path.display(), status = %report.status, "final report saved");
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RunStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn report() -> FinalReport {
        FinalReport {
            run_id: "0badf00d".to_string(),
            status: RunStatus::Unvalidated,
            final_insight: json!({"summary": "CTR fell", "evidence": ["ctr"]}),
            validation: json!({"is_valid": false, "critique": "weak"}),
            creatives: json!(null),
            retry_count: 3,
            error_log: None,
        }
    }

    #[test]
    fn rendering_is_indented_and_stable() {
        let a = render_report(&report()).unwrap();
        let b = render_report(&report()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("{\n  \"run_id\": \"0badf00d\",\n  \"status\": \"Unvalidated\","));
        assert!(a.ends_with("}\n"));
    }

    #[test]
    fn persists_to_run_dir_and_shared_path() {
        let tmp = TempDir::new().unwrap();
        let run_dir = tmp.path().join("run_0badf00d");
        fs::create_dir_all(&run_dir).unwrap();
        let shared = tmp.path().join("reports").join("final_report.json");

        let written = ReportSink::new(&shared)
            .persist(&report(), Some(&run_dir))
            .unwrap();
        assert_eq!(written, vec![run_dir.join(REPORT_FILE), shared.clone()]);
        assert_eq!(
            fs::read_to_string(&shared).unwrap(),
            fs::read_to_string(run_dir.join(REPORT_FILE)).unwrap()
        );
        // no temporary files left behind
        let leftovers = fs::read_dir(tmp.path().join("reports")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn shared_path_is_overwritten() {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("final_report.json");
        fs::write(&shared, "stale").unwrap();

        ReportSink::new(&shared).persist(&report(), None).unwrap();
        let body = fs::read_to_string(&shared).unwrap();
        assert!(body.contains("\"retry_count\": 3"));
    }

    #[test]
    fn run_dir_only_without_dir_writes_nothing() {
        let written = ReportSink::run_dir_only().persist(&report(), None).unwrap();
        assert!(written.is_empty());
    }
}
