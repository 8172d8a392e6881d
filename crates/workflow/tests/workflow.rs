//! End-to-end runs of the workflow graph with scripted and heuristic
//! collaborators.

use std::fs;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use time::macros::date;

use adpulse_core::{fatigue_scenario, Dataset, SyntheticConfig};
use adpulse_storage::{
    FsRunLogger, MemoryRunLogger, ReportSink, RunLogger, RunStatus, REPORT_FILE, RUN_RECORD_FILE,
};
use adpulse_workflow::{
    DataSource, GenerationCollaborator, GenerationError, HeuristicCollaborator, Validation,
    Workflow, WorkflowConfig, WorkflowError,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn fatigue_data() -> DataSource {
    let dataset = fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30))).unwrap();
    DataSource::InMemory(dataset)
}

fn broken_data() -> DataSource {
    let mut records = fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30)))
        .unwrap()
        .into_records();
    records[4].frequency = 0.5;
    DataSource::InMemory(Dataset::new(records))
}

/// Collaborator whose verdicts are scripted; records the critiques it sees.
#[derive(Default)]
struct Scripted {
    /// Verdicts handed out in order; once exhausted every hypothesis is rejected.
    verdicts: Mutex<Vec<bool>>,
    critiques: Mutex<Vec<Option<String>>>,
    fail_creatives: bool,
}

impl Scripted {
    fn with_verdicts(verdicts: &[bool]) -> Self {
        Scripted {
            verdicts: Mutex::new(verdicts.to_vec()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerationCollaborator for &'static Scripted {
    async fn generate_hypothesis(
        &self,
        _query: &str,
        _analysis_json: &str,
        critique: Option<&str>,
    ) -> Result<Value, GenerationError> {
        let mut seen = self.critiques.lock().unwrap();
        seen.push(critique.map(str::to_string));
        Ok(json!({"attempt": seen.len(), "primary_driver": "ctr"}))
    }

    async fn validate_hypothesis(
        &self,
        hypothesis: &Value,
        _analysis_json: &str,
    ) -> Result<Validation, GenerationError> {
        let mut verdicts = self.verdicts.lock().unwrap();
        let valid = if verdicts.is_empty() {
            false
        } else {
            verdicts.remove(0)
        };
        Ok(if valid {
            Validation::accepted("fine")
        } else {
            Validation::rejected(format!("reject {}", hypothesis["attempt"]))
        })
    }

    async fn generate_creatives(
        &self,
        _hypothesis: &Value,
        variants: &[String],
    ) -> Result<Value, GenerationError> {
        if self.fail_creatives {
            return Err(GenerationError::Malformed {
                what: "creatives",
                message: "empty response".to_string(),
            });
        }
        Ok(json!(variants))
    }
}

fn leak(s: Scripted) -> &'static Scripted {
    Box::leak(Box::new(s))
}

fn workflow(source: DataSource, collaborator: Box<dyn GenerationCollaborator>) -> Workflow {
    Workflow::new(WorkflowConfig::default(), source, collaborator).with_sink(ReportSink::run_dir_only())
}

fn stages_of(logger: &dyn RunLogger) -> Vec<String> {
    logger.record().traces.iter().map(|t| t.stage.clone()).collect()
}

// ──────────────────────────────────────────────
// Routing
// ──────────────────────────────────────────────

#[tokio::test]
async fn heuristic_run_on_fatigue_data_succeeds() {
    let wf = workflow(fatigue_data(), Box::new(HeuristicCollaborator::default()));
    let mut logger = MemoryRunLogger::with_run_id("00000001");

    let out = wf.run("Why did ROAS drop last week?", &mut logger).await.unwrap();

    assert_eq!(out.report.status, RunStatus::Success);
    assert_eq!(out.report.retry_count, 0);
    assert_eq!(out.report.error_log, None);
    assert_eq!(out.steps, 5);
    assert_eq!(
        stages_of(&logger),
        ["data", "insight", "evaluator", "creative", "report"]
    );
    assert_eq!(out.report.creatives[0]["variant"], "Ad_Variant_A");
    assert!(out.record.is_finalized());
}

#[tokio::test]
async fn data_failure_skips_straight_to_report() {
    let scripted = leak(Scripted::with_verdicts(&[true]));
    let wf = workflow(broken_data(), Box::new(scripted));
    let mut logger = MemoryRunLogger::new();

    let out = wf.run("q", &mut logger).await.unwrap();

    assert_eq!(out.report.status, RunStatus::Failed);
    assert_eq!(stages_of(&logger), ["data", "report"]);
    let error_log = out.report.error_log.as_deref().unwrap();
    assert!(
        error_log.starts_with("CRITICAL FAILURE: Data Governance Failure: Schema Validation Failed:\nRow 4 Error:"),
        "{error_log}"
    );
    assert_eq!(out.report.final_insight, Value::Null);
    assert_eq!(out.report.validation, Value::Null);
    assert!(scripted.critiques.lock().unwrap().is_empty());
    assert_eq!(logger.record().errors.len(), 1);

    let summary: Value = serde_json::from_str(out.state.data_summary.as_deref().unwrap()).unwrap();
    assert!(summary["error"].as_str().unwrap().starts_with("Data Governance Failure"));
}

#[tokio::test]
async fn retries_are_exhausted_then_reported_unvalidated() {
    let scripted = leak(Scripted::default());
    let wf = workflow(fatigue_data(), Box::new(scripted));
    let mut logger = MemoryRunLogger::new();

    let out = wf.run("q", &mut logger).await.unwrap();

    assert_eq!(out.report.status, RunStatus::Unvalidated);
    assert_eq!(out.report.retry_count, 3);
    assert_eq!(logger.record().traces_for("evaluator").count(), 4);
    assert_eq!(logger.record().traces_for("insight").count(), 4);
    assert_eq!(logger.record().traces_for("creative").count(), 0);
    assert_eq!(out.steps, 10);
    assert_eq!(out.report.validation["critique"], "reject 4");

    let critiques = scripted.critiques.lock().unwrap().clone();
    assert_eq!(
        critiques,
        [
            None,
            Some("reject 1".to_string()),
            Some("reject 2".to_string()),
            Some("reject 3".to_string()),
        ]
    );
}

#[tokio::test]
async fn acceptance_after_one_retry() {
    let scripted = leak(Scripted::with_verdicts(&[false, true]));
    let wf = workflow(fatigue_data(), Box::new(scripted));
    let mut logger = MemoryRunLogger::new();

    let out = wf.run("q", &mut logger).await.unwrap();

    assert_eq!(out.report.status, RunStatus::Success);
    assert_eq!(out.report.retry_count, 1);
    assert_eq!(
        stages_of(&logger),
        ["data", "insight", "evaluator", "insight", "evaluator", "creative", "report"]
    );
    assert_eq!(out.report.final_insight["attempt"], 2);
}

#[tokio::test]
async fn collaborator_failure_becomes_sentinel() {
    let scripted = leak(Scripted {
        verdicts: Mutex::new(vec![true]),
        fail_creatives: true,
        ..Default::default()
    });
    let wf = workflow(fatigue_data(), Box::new(scripted));
    let mut logger = MemoryRunLogger::new();

    let out = wf.run("q", &mut logger).await.unwrap();

    assert_eq!(out.report.status, RunStatus::Failed);
    assert_eq!(
        out.report.error_log.as_deref(),
        Some("CRITICAL FAILURE: creative: malformed creatives: empty response")
    );
    let creative = logger.record().traces_for("creative").next().unwrap();
    assert_eq!(
        creative.output["error"],
        "creative: malformed creatives: empty response"
    );
    assert_eq!(stages_of(&logger).last().map(String::as_str), Some("report"));
}

#[tokio::test]
async fn runaway_routing_hits_the_step_limit() {
    let config = WorkflowConfig {
        max_retries: 100,
        max_steps: 10,
        ..Default::default()
    };
    let wf = Workflow::new(config, fatigue_data(), Box::new(leak(Scripted::default())))
        .with_sink(ReportSink::run_dir_only());
    let mut logger = MemoryRunLogger::new();

    let err = wf.run("q", &mut logger).await.unwrap_err();
    assert!(matches!(err, WorkflowError::StepLimitExceeded { limit: 10, .. }));
    assert_eq!(logger.record().traces.len(), 10);
    assert!(!logger.record().is_finalized());
}

// ──────────────────────────────────────────────
// Persistence
// ──────────────────────────────────────────────

#[tokio::test]
async fn file_run_writes_both_reports_and_traces() {
    let tmp = TempDir::new().unwrap();
    let shared = tmp.path().join("reports").join("final_report.json");
    let wf = Workflow::new(
        WorkflowConfig::default(),
        fatigue_data(),
        Box::new(HeuristicCollaborator::default()),
    )
    .with_sink(ReportSink::new(&shared));
    let mut logger = FsRunLogger::create(tmp.path().join("logs")).unwrap();

    let out = wf.run("q", &mut logger).await.unwrap();

    let run_dir = logger.dir().to_path_buf();
    assert_eq!(out.report_paths, vec![run_dir.join(REPORT_FILE), shared.clone()]);
    let local = fs::read_to_string(run_dir.join(REPORT_FILE)).unwrap();
    assert_eq!(local, fs::read_to_string(&shared).unwrap());
    assert!(run_dir.join(RUN_RECORD_FILE).exists());

    let traces = fs::read_dir(&run_dir)
        .unwrap()
        .filter(|e| {
            let name = e.as_ref().unwrap().file_name();
            name.to_string_lossy().starts_with(|c: char| c.is_ascii_digit())
        })
        .count();
    assert_eq!(traces, 5);

    let parsed: Value = serde_json::from_str(&local).unwrap();
    assert_eq!(parsed["run_id"], logger.run_id());
    assert_eq!(parsed["status"], "Success");
}

#[tokio::test]
async fn identical_runs_write_identical_reports() {
    let tmp = TempDir::new().unwrap();
    let shared = tmp.path().join("final_report.json");
    let wf = Workflow::new(
        WorkflowConfig::default(),
        fatigue_data(),
        Box::new(HeuristicCollaborator::default()),
    )
    .with_sink(ReportSink::new(&shared));

    let mut first = MemoryRunLogger::with_run_id("feedbeef");
    wf.run("Why did ROAS drop?", &mut first).await.unwrap();
    let a = fs::read(&shared).unwrap();

    let mut second = MemoryRunLogger::with_run_id("feedbeef");
    wf.run("Why did ROAS drop?", &mut second).await.unwrap();
    let b = fs::read(&shared).unwrap();

    assert_eq!(a, b);
}
