//! The orchestrator: owns the state of one run, executes stages one at a
//! time, merges their deltas and follows the routing table to the end.

use std::path::PathBuf;

use adpulse_storage::{FinalReport, ReportSink, RunLogger, RunRecord};

use crate::collaborator::GenerationCollaborator;
use crate::config::WorkflowConfig;
use crate::error::{StageError, WorkflowError};
use crate::stage::{route, Next, Stage};
use crate::stages::{self, DataSource, StageOutcome};
use crate::state::{StateDelta, WorkflowState};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: WorkflowState,
    pub report: FinalReport,
    pub record: RunRecord,
    /// Files the report was written to.
    pub report_paths: Vec<PathBuf>,
    /// Stage executions performed.
    pub steps: u32,
}

/// A configured workflow, ready to run queries.
pub struct Workflow {
    config: WorkflowConfig,
    source: DataSource,
    collaborator: Box<dyn GenerationCollaborator>,
    sink: ReportSink,
}

impl Workflow {
    /// Report sink defaults to `config.shared_report_path`.
    pub fn new(
        config: WorkflowConfig,
        source: DataSource,
        collaborator: Box<dyn GenerationCollaborator>,
    ) -> Self {
        let sink = ReportSink::new(config.shared_report_path.clone());
        Workflow {
            config,
            source,
            collaborator,
            sink,
        }
    }

    pub fn with_sink(mut self, sink: ReportSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run `query` through the graph, recording into `logger`.
    ///
    /// Domain failures (bad data, a failing collaborator) end in a report
    /// with status `Failed`; only storage errors and a runaway route return
    /// `Err`.
    pub async fn run(
        &self,
        query: &str,
        logger: &mut dyn RunLogger,
    ) -> Result<RunOutcome, WorkflowError> {
        let mut state = WorkflowState::new(query);
        let mut stage = Stage::ENTRY;
        let mut report_paths = Vec::new();
        let mut steps = 0;

        tracing::info!(run_id = %logger.run_id(), query, "workflow started");

        loop {
            steps += 1;
            if steps > self.config.max_steps {
                logger.log_error(&format!(
                    "exceeded maximum step count ({}) at stage '{stage}'",
                    self.config.max_steps
                ))?;
                return Err(WorkflowError::StepLimitExceeded {
                    limit: self.config.max_steps,
                    stage,
                });
            }

            let input = stages::trace_input(stage, &state, &self.config.creative_variants);
            tracing::debug!(%stage, step = steps, "entering stage");

            let collaborator = self.collaborator.as_ref();
            let outcome = match stage {
                Stage::Data => stages::data(&self.source, &self.config.analysis_options()),
                Stage::Insight => caught(stage, stages::insight(collaborator, &state).await),
                Stage::Evaluator => caught(stage, stages::evaluator(collaborator, &state).await),
                Stage::Creative => caught(
                    stage,
                    stages::creative(collaborator, &state, &self.config.creative_variants).await,
                ),
                Stage::Report => {
                    let report = stages::assemble_report(logger.run_id(), &state);
                    report_paths = self.sink.persist(&report, logger.run_dir())?;
                    let output = serde_json::to_value(&report).unwrap_or_default();
                    StageOutcome {
                        delta: StateDelta {
                            report: Some(report),
                            ..Default::default()
                        },
                        output,
                        error: None,
                    }
                }
            };

            if let Some(message) = &outcome.error {
                tracing::error!(%stage, error = %message, "stage failed");
                logger.log_error(message)?;
            }
            logger.log_step(stage.name(), stage.agent(), &input, &outcome.output)?;
            state.merge(outcome.delta);

            let transition = route(stage, &state, self.config.max_retries);
            if transition.retry {
                state.retry_count += 1;
                tracing::info!(
                    retry_count = state.retry_count,
                    max_retries = self.config.max_retries,
                    "retrying insight"
                );
            }
            match transition.next {
                Next::Stage(next) => {
                    tracing::debug!(from = %stage, to = %next, "route");
                    stage = next;
                }
                Next::End => break,
            }
        }

        let report = state.report.clone().ok_or(WorkflowError::MissingReport)?;
        let record = logger.finalize(&report)?;
        tracing::info!(
            run_id = %report.run_id,
            status = %report.status,
            retry_count = report.retry_count,
            steps,
            "workflow finished"
        );

        Ok(RunOutcome {
            state,
            report,
            record,
            report_paths,
            steps,
        })
    }
}

/// Convert a stage error into the failure outcome at the stage boundary.
fn caught(stage: Stage, result: Result<StageOutcome, StageError>) -> StageOutcome {
    result.unwrap_or_else(|err| StageOutcome::failed(stage, &err))
}
