use std::fmt;
use std::path::PathBuf;

use adpulse_core::delta::DEFAULT_CURRENT_WINDOW_DAYS;
use adpulse_core::{AnalysisOptions, DEFAULT_DRIFT_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Default model identifier for the LLM collaborator.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Which generation collaborator backs the insight, evaluator and creative stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorKind {
    /// Deterministic, offline.
    #[default]
    Heuristic,
    /// Language-model backed; needs the `anthropic` feature.
    Llm,
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorKind::Heuristic => f.write_str("heuristic"),
            CollaboratorKind::Llm => f.write_str("llm"),
        }
    }
}

/// Settings for one workflow run.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Rejections tolerated before the evaluator routes to the report.
    pub max_retries: u32,
    pub drift_threshold: f64,
    pub current_window_days: i64,
    pub creative_variants: Vec<String>,
    /// Upper bound on stage executions in one run.
    pub max_steps: u32,
    pub logs_dir: PathBuf,
    pub shared_report_path: PathBuf,
    pub data_path: PathBuf,
    pub collaborator: CollaboratorKind,
    pub model: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            max_retries: 3,
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
            creative_variants: vec!["Ad_Variant_A".to_string()],
            max_steps: 64,
            logs_dir: PathBuf::from("logs"),
            shared_report_path: PathBuf::from("reports/final_report.json"),
            data_path: PathBuf::from("data/synthetic_fb_data.csv"),
            collaborator: CollaboratorKind::Heuristic,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Reject values that no run could use.
    pub fn validate(&self) -> Result<(), String> {
        if self.current_window_days < 1 {
            return Err(format!(
                "current_window_days must be at least 1 (got {})",
                self.current_window_days
            ));
        }
        if !self.drift_threshold.is_finite() {
            return Err(format!(
                "drift_threshold must be a finite number (got {})",
                self.drift_threshold
            ));
        }
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            drift_threshold: self.drift_threshold,
            current_window_days: self.current_window_days,
        }
    }
}
