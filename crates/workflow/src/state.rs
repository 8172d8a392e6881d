//! The record threaded through every stage of a run, and the partial updates
//! stages hand back to the orchestrator.

use adpulse_storage::FinalReport;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of `final_report` when a stage failure tripped the circuit breaker.
pub const FAILURE_SENTINEL: &str = "CRITICAL FAILURE: ";

/// Verdict of the evaluator on one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(default)]
    pub critique: String,
    /// Any further fields the collaborator reported.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Validation {
    pub fn accepted(critique: impl Into<String>) -> Self {
        Validation {
            is_valid: true,
            critique: critique.into(),
            extra: Map::new(),
        }
    }

    pub fn rejected(critique: impl Into<String>) -> Self {
        Validation {
            is_valid: false,
            critique: critique.into(),
            extra: Map::new(),
        }
    }
}

/// State of one workflow run.
///
/// Created once per run and only changed through [`WorkflowState::merge`]
/// and the retry counter bump applied by the orchestrator on a retry edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowState {
    pub query: String,
    /// JSON text of the analysis, or of `{"error": ...}` when the data stage failed.
    pub data_summary: Option<String>,
    pub hypothesis: Option<Value>,
    pub validation: Option<Validation>,
    pub creatives: Option<Value>,
    pub retry_count: u32,
    /// Sentinel-prefixed failure description, when a stage failed.
    pub final_report: Option<String>,
    pub report: Option<FinalReport>,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        WorkflowState {
            query: query.into(),
            ..Default::default()
        }
    }

    /// True once any stage failure has been recorded.
    pub fn has_failed(&self) -> bool {
        self.final_report
            .as_deref()
            .is_some_and(|r| r.starts_with(FAILURE_SENTINEL))
    }

    pub fn is_validated(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.is_valid)
    }

    /// Critique of the most recent rejected hypothesis.
    pub fn critique(&self) -> Option<&str> {
        self.validation
            .as_ref()
            .filter(|v| !v.is_valid)
            .map(|v| v.critique.as_str())
    }

    /// Overwrite every key the delta carries. Keys it leaves empty are kept.
    pub fn merge(&mut self, delta: StateDelta) {
        let StateDelta {
            data_summary,
            hypothesis,
            validation,
            creatives,
            final_report,
            report,
        } = delta;

        if data_summary.is_some() {
            self.data_summary = data_summary;
        }
        if hypothesis.is_some() {
            self.hypothesis = hypothesis;
        }
        if validation.is_some() {
            self.validation = validation;
        }
        if creatives.is_some() {
            self.creatives = creatives;
        }
        if final_report.is_some() {
            self.final_report = final_report;
        }
        if report.is_some() {
            self.report = report;
        }
    }
}

/// Keys written by one stage execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub data_summary: Option<String>,
    pub hypothesis: Option<Value>,
    pub validation: Option<Validation>,
    pub creatives: Option<Value>,
    pub final_report: Option<String>,
    pub report: Option<FinalReport>,
}

impl StateDelta {
    /// Delta recording a stage failure behind the sentinel.
    pub fn failure(message: &str) -> Self {
        StateDelta {
            final_report: Some(format!("{FAILURE_SENTINEL}{message}")),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_only_touches_present_keys() {
        let mut state = WorkflowState::new("why did ROAS drop?");
        state.merge(StateDelta {
            data_summary: Some("{}".into()),
            ..Default::default()
        });
        state.merge(StateDelta {
            hypothesis: Some(json!({"primary_driver": "ctr"})),
            ..Default::default()
        });

        assert_eq!(state.query, "why did ROAS drop?");
        assert_eq!(state.data_summary.as_deref(), Some("{}"));
        assert_eq!(state.hypothesis, Some(json!({"primary_driver": "ctr"})));
        assert!(state.validation.is_none());
        assert!(!state.has_failed());
    }

    #[test]
    fn failure_delta_sets_sentinel() {
        let mut state = WorkflowState::new("q");
        state.merge(StateDelta::failure("insight: malformed hypothesis"));
        assert!(state.has_failed());
        assert_eq!(
            state.final_report.as_deref(),
            Some("CRITICAL FAILURE: insight: malformed hypothesis")
        );
    }

    #[test]
    fn critique_is_only_exposed_for_rejections() {
        let mut state = WorkflowState::new("q");
        assert_eq!(state.critique(), None);

        state.merge(StateDelta {
            validation: Some(Validation::rejected("cites no evidence")),
            ..Default::default()
        });
        assert_eq!(state.critique(), Some("cites no evidence"));
        assert!(!state.is_validated());

        state.merge(StateDelta {
            validation: Some(Validation::accepted("ok")),
            ..Default::default()
        });
        assert_eq!(state.critique(), None);
        assert!(state.is_validated());
    }

    #[test]
    fn validation_keeps_extra_fields() {
        let v: Validation = serde_json::from_value(json!({
            "is_valid": false,
            "critique": "weak",
            "confidence": 0.2
        }))
        .unwrap();
        assert_eq!(v.extra["confidence"], json!(0.2));
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"is_valid": false, "critique": "weak", "confidence": 0.2})
        );
    }
}
