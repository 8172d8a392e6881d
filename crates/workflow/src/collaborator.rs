use async_trait::async_trait;
use serde_json::Value;

use crate::config::{CollaboratorKind, WorkflowConfig};
use crate::error::GenerationError;
use crate::heuristic::HeuristicCollaborator;
use crate::state::Validation;

/// The generation steps the workflow delegates: diagnose, check, write copy.
///
/// `analysis_json` is the data stage's output as JSON text. Hypotheses and
/// creatives are opaque JSON to the orchestrator.
#[async_trait]
pub trait GenerationCollaborator: Send + Sync {
    /// Propose a diagnosis for `query`. On a retry `critique` carries the
    /// evaluator's objection to the previous attempt.
    async fn generate_hypothesis(
        &self,
        query: &str,
        analysis_json: &str,
        critique: Option<&str>,
    ) -> Result<Value, GenerationError>;

    /// Check `hypothesis` against the analysis it claims to explain.
    async fn validate_hypothesis(
        &self,
        hypothesis: &Value,
        analysis_json: &str,
    ) -> Result<Validation, GenerationError>;

    /// Write one ad creative per entry of `variants`.
    async fn generate_creatives(
        &self,
        hypothesis: &Value,
        variants: &[String],
    ) -> Result<Value, GenerationError>;
}

/// Build the collaborator selected by `config.collaborator`.
pub fn build_collaborator(
    config: &WorkflowConfig,
) -> Result<Box<dyn GenerationCollaborator>, GenerationError> {
    match config.collaborator {
        CollaboratorKind::Heuristic => Ok(Box::new(HeuristicCollaborator::default())),
        CollaboratorKind::Llm => llm_collaborator(config),
    }
}

#[cfg(feature = "anthropic")]
fn llm_collaborator(
    config: &WorkflowConfig,
) -> Result<Box<dyn GenerationCollaborator>, GenerationError> {
    use crate::llm::{AnthropicClient, LlmCollaborator};

    let client = AnthropicClient::from_env()?;
    Ok(Box::new(LlmCollaborator::new(
        Box::new(client),
        config.model.clone(),
    )))
}

#[cfg(not(feature = "anthropic"))]
fn llm_collaborator(
    config: &WorkflowConfig,
) -> Result<Box<dyn GenerationCollaborator>, GenerationError> {
    Err(GenerationError::Unavailable(config.collaborator.to_string()))
}
