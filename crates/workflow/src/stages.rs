//! The unit of work behind each stage.
//!
//! Stages read the state and return a [`StageOutcome`]; they never write the
//! state themselves.

use std::path::PathBuf;

use serde_json::{json, Value};

use adpulse_core::{analyze_dataset, analyze_file, AnalysisOptions, CoreError, Dataset};
use adpulse_storage::{FinalReport, RunStatus};

use crate::collaborator::GenerationCollaborator;
use crate::error::StageError;
use crate::stage::Stage;
use crate::state::{StateDelta, WorkflowState, FAILURE_SENTINEL};

/// Where the data stage reads its dataset from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A CSV file, read fresh on every run.
    Csv(PathBuf),
    InMemory(Dataset),
}

impl DataSource {
    fn analyze(&self, options: &AnalysisOptions) -> Result<String, CoreError> {
        let analysis = match self {
            DataSource::Csv(path) => analyze_file(path, options)?,
            DataSource::InMemory(dataset) => analyze_dataset(dataset.clone(), options)?,
        };
        analysis.to_json()
    }
}

/// Result of running one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub delta: StateDelta,
    /// Recorded as the trace output.
    pub output: Value,
    /// Failure message to log against the run, if the stage failed.
    pub error: Option<String>,
}

impl StageOutcome {
    fn ok(delta: StateDelta, output: Value) -> Self {
        StageOutcome {
            delta,
            output,
            error: None,
        }
    }

    /// Outcome of a stage whose error was caught at the boundary.
    pub fn failed(stage: Stage, err: &StageError) -> Self {
        let message = format!("{stage}: {err}");
        StageOutcome {
            delta: StateDelta::failure(&message),
            output: json!({ "error": message }),
            error: Some(message),
        }
    }
}

/// Trace input recorded for `stage` given the state it is about to read.
pub fn trace_input(stage: Stage, state: &WorkflowState, variants: &[String]) -> Value {
    match stage {
        Stage::Data => json!({ "query": state.query }),
        Stage::Insight => json!({
            "query": state.query,
            "data_summary": state.data_summary,
            "critique": state.critique(),
        }),
        Stage::Evaluator => json!({ "hypothesis": state.hypothesis }),
        Stage::Creative => json!({ "insight": state.hypothesis, "variants": variants }),
        Stage::Report => json!({
            "retry_count": state.retry_count,
            "final_report": state.final_report,
        }),
    }
}

/// Load, validate and analyse the dataset.
///
/// Any failure becomes `{"error": ...}` in `data_summary` plus the sentinel
/// in `final_report`, which the router treats as the circuit breaker.
pub fn data(source: &DataSource, options: &AnalysisOptions) -> StageOutcome {
    match source.analyze(options) {
        Ok(summary) => {
            let output = serde_json::from_str(&summary).unwrap_or(Value::Null);
            StageOutcome::ok(
                StateDelta {
                    data_summary: Some(summary),
                    ..Default::default()
                },
                output,
            )
        }
        Err(err) => {
            let message = format!("Data Governance Failure: {err}");
            tracing::warn!(error = %message, "data stage rejected the dataset");
            let output = json!({ "error": message });
            StageOutcome {
                delta: StateDelta {
                    data_summary: Some(output.to_string()),
                    final_report: Some(format!("{FAILURE_SENTINEL}{message}")),
                    ..Default::default()
                },
                output,
                error: Some(message),
            }
        }
    }
}

pub async fn insight(
    collaborator: &dyn GenerationCollaborator,
    state: &WorkflowState,
) -> Result<StageOutcome, StageError> {
    let summary = state
        .data_summary
        .as_deref()
        .ok_or(StageError::MissingInput("data_summary"))?;
    let hypothesis = collaborator
        .generate_hypothesis(&state.query, summary, state.critique())
        .await?;
    Ok(StageOutcome::ok(
        StateDelta {
            hypothesis: Some(hypothesis.clone()),
            ..Default::default()
        },
        hypothesis,
    ))
}

pub async fn evaluator(
    collaborator: &dyn GenerationCollaborator,
    state: &WorkflowState,
) -> Result<StageOutcome, StageError> {
    let hypothesis = state
        .hypothesis
        .as_ref()
        .ok_or(StageError::MissingInput("hypothesis"))?;
    let summary = state
        .data_summary
        .as_deref()
        .ok_or(StageError::MissingInput("data_summary"))?;
    let validation = collaborator.validate_hypothesis(hypothesis, summary).await?;

    if validation.is_valid {
        tracing::info!("hypothesis accepted");
    } else {
        tracing::info!(critique = %validation.critique, retry_count = state.retry_count, "hypothesis rejected");
    }

    let output = json!(validation);
    Ok(StageOutcome::ok(
        StateDelta {
            validation: Some(validation),
            ..Default::default()
        },
        output,
    ))
}

pub async fn creative(
    collaborator: &dyn GenerationCollaborator,
    state: &WorkflowState,
    variants: &[String],
) -> Result<StageOutcome, StageError> {
    let hypothesis = state
        .hypothesis
        .as_ref()
        .ok_or(StageError::MissingInput("hypothesis"))?;
    let creatives = collaborator.generate_creatives(hypothesis, variants).await?;
    Ok(StageOutcome::ok(
        StateDelta {
            creatives: Some(creatives.clone()),
            ..Default::default()
        },
        creatives,
    ))
}

/// Classify a run from the state the report stage sees.
pub fn run_status(state: &WorkflowState) -> RunStatus {
    if state.has_failed() {
        RunStatus::Failed
    } else if state.is_validated() {
        RunStatus::Success
    } else {
        RunStatus::Unvalidated
    }
}

/// Assemble the final report. Pure: equal states give equal reports.
pub fn assemble_report(run_id: &str, state: &WorkflowState) -> FinalReport {
    FinalReport {
        run_id: run_id.to_string(),
        status: run_status(state),
        final_insight: state.hypothesis.clone().unwrap_or(Value::Null),
        validation: state
            .validation
            .as_ref()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        creatives: state.creatives.clone().unwrap_or(Value::Null),
        retry_count: state.retry_count,
        error_log: state.final_report.clone(),
    }
}
