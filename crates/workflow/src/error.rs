use adpulse_storage::StorageError;

use crate::llm::LlmError;
use crate::stage::Stage;

/// Failure of a generation collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The collaborator produced something that is not the expected shape.
    #[error("malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },

    /// The analysis handed to the collaborator could not be read.
    #[error("unreadable analysis: {0}")]
    Analysis(#[source] serde_json::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The requested collaborator is not compiled into this build.
    #[error("collaborator '{0}' is not available in this build")]
    Unavailable(String),
}

/// Failure inside one stage. Caught at the stage boundary and turned into
/// the circuit-breaker sentinel; never returned from `Workflow::run`.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A key the stage reads was never written by an earlier stage.
    #[error("missing input '{0}'")]
    MissingInput(&'static str),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Conditions that prevent a run from producing a report.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Routing did not reach the end marker within the configured budget.
    #[error("workflow exceeded maximum step count ({limit}) at stage '{stage}'")]
    StepLimitExceeded { limit: u32, stage: Stage },

    /// The report stage completed without leaving a report in the state.
    #[error("run ended without a final report")]
    MissingReport,
}
