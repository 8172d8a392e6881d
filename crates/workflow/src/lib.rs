//! adpulse-workflow: the staged insight workflow.
//!
//! A run walks a fixed graph of stages:
//!
//! - **data**: load, validate and analyse the dataset (circuit breaker on failure)
//! - **insight**: propose a hypothesis for the query
//! - **evaluator**: accept or reject it; rejections loop back to insight
//!   until the retry budget is spent
//! - **creative**: write ad copy for an accepted hypothesis
//! - **report**: persist the final report
//!
//! Generation is delegated to a [`GenerationCollaborator`]; persistence to a
//! [`adpulse_storage::RunLogger`] and [`adpulse_storage::ReportSink`].

pub mod collaborator;
pub mod config;
pub mod engine;
pub mod error;
pub mod heuristic;
pub mod llm;
pub mod stage;
pub mod stages;
pub mod state;

pub use collaborator::{build_collaborator, GenerationCollaborator};
pub use config::{CollaboratorKind, WorkflowConfig, DEFAULT_MODEL};
pub use engine::{RunOutcome, Workflow};
pub use error::{GenerationError, StageError, WorkflowError};
pub use heuristic::HeuristicCollaborator;
#[cfg(feature = "anthropic")]
pub use llm::AnthropicClient;
pub use llm::{LlmClient, LlmCollaborator, LlmError, Message};
pub use stage::{route, Next, Stage, Transition};
pub use stages::DataSource;
pub use state::{StateDelta, Validation, WorkflowState, FAILURE_SENTINEL};
