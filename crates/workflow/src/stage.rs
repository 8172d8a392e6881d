//! Stages of the workflow graph and the routing table between them.
//!
//! ```text
//! data ──ok──▶ insight ──▶ evaluator ──valid──▶ creative ──▶ report ──▶ end
//!   │             ▲            │  │                              ▲
//!   │             └──retry─────┘  └──rejected, retries spent─────┤
//!   └──failed──────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::WorkflowState;

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Data,
    Insight,
    Evaluator,
    Creative,
    Report,
}

impl Stage {
    /// Where every run starts.
    pub const ENTRY: Stage = Stage::Data;

    pub const ALL: [Stage; 5] = [
        Stage::Data,
        Stage::Insight,
        Stage::Evaluator,
        Stage::Creative,
        Stage::Report,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Data => "data",
            Stage::Insight => "insight",
            Stage::Evaluator => "evaluator",
            Stage::Creative => "creative",
            Stage::Report => "report",
        }
    }

    /// Name recorded on traces for this stage.
    pub fn agent(self) -> &'static str {
        match self {
            Stage::Data => "DataAgent",
            Stage::Insight => "InsightAgent",
            Stage::Evaluator => "EvaluatorAgent",
            Stage::Creative => "CreativeAgent",
            Stage::Report => "Reporter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stage(Stage),
    End,
}

/// Outcome of routing from one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Next,
    /// Set on the evaluator-to-insight edge; the orchestrator bumps `retry_count`.
    pub retry: bool,
}

impl Transition {
    fn to(stage: Stage) -> Self {
        Transition {
            next: Next::Stage(stage),
            retry: false,
        }
    }

    fn retry(stage: Stage) -> Self {
        Transition {
            next: Next::Stage(stage),
            retry: true,
        }
    }

    fn end() -> Self {
        Transition {
            next: Next::End,
            retry: false,
        }
    }
}

/// Pick the stage that follows `stage`, given the state after `stage` ran.
///
/// Any recorded failure sends the run straight to `report`.
///
/// The retry guard reads `retry_count` before the orchestrator increments it,
/// so with `max_retries = 3` a run that is never validated is evaluated four
/// times: the first attempt plus three retries.
pub fn route(stage: Stage, state: &WorkflowState, max_retries: u32) -> Transition {
    match stage {
        Stage::Report => Transition::end(),
        _ if state.has_failed() => Transition::to(Stage::Report),
        Stage::Data => Transition::to(Stage::Insight),
        Stage::Insight => Transition::to(Stage::Evaluator),
        Stage::Evaluator if state.is_validated() => Transition::to(Stage::Creative),
        Stage::Evaluator if state.retry_count < max_retries => Transition::retry(Stage::Insight),
        Stage::Evaluator => Transition::to(Stage::Report),
        Stage::Creative => Transition::to(Stage::Report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateDelta, Validation};

    fn with_validation(valid: bool, retry_count: u32) -> WorkflowState {
        let mut state = WorkflowState::new("q");
        state.retry_count = retry_count;
        state.merge(StateDelta {
            validation: Some(if valid {
                Validation::accepted("")
            } else {
                Validation::rejected("no")
            }),
            ..Default::default()
        });
        state
    }

    #[test]
    fn happy_path_edges() {
        let state = WorkflowState::new("q");
        assert_eq!(route(Stage::Data, &state, 3), Transition::to(Stage::Insight));
        assert_eq!(route(Stage::Insight, &state, 3), Transition::to(Stage::Evaluator));
        assert_eq!(
            route(Stage::Evaluator, &with_validation(true, 0), 3),
            Transition::to(Stage::Creative)
        );
        assert_eq!(route(Stage::Creative, &state, 3), Transition::to(Stage::Report));
        assert_eq!(route(Stage::Report, &state, 3), Transition::end());
    }

    #[test]
    fn data_failure_short_circuits_to_report() {
        let mut state = WorkflowState::new("q");
        state.merge(StateDelta::failure("Data Governance Failure: dataset is empty"));
        assert_eq!(route(Stage::Data, &state, 3), Transition::to(Stage::Report));
    }

    #[test]
    fn rejection_retries_until_the_ceiling() {
        for retry_count in 0..3 {
            let t = route(Stage::Evaluator, &with_validation(false, retry_count), 3);
            assert_eq!(t, Transition::retry(Stage::Insight), "retry_count {retry_count}");
        }
        assert_eq!(
            route(Stage::Evaluator, &with_validation(false, 3), 3),
            Transition::to(Stage::Report)
        );
    }

    #[test]
    fn accepted_hypothesis_wins_over_retry_budget() {
        assert_eq!(
            route(Stage::Evaluator, &with_validation(true, 3), 3),
            Transition::to(Stage::Creative)
        );
    }

    #[test]
    fn zero_retries_reports_on_first_rejection() {
        assert_eq!(
            route(Stage::Evaluator, &with_validation(false, 0), 0),
            Transition::to(Stage::Report)
        );
    }

    #[test]
    fn failure_in_any_middle_stage_goes_to_report() {
        let mut state = with_validation(true, 0);
        state.merge(StateDelta::failure("creative: timeout"));
        for stage in [Stage::Insight, Stage::Evaluator, Stage::Creative] {
            assert_eq!(route(stage, &state, 3), Transition::to(Stage::Report));
        }
        assert_eq!(route(Stage::Report, &state, 3), Transition::end());
    }

    #[test]
    fn agent_names() {
        let agents: Vec<_> = Stage::ALL.iter().map(|s| s.agent()).collect();
        assert_eq!(
            agents,
            ["DataAgent", "InsightAgent", "EvaluatorAgent", "CreativeAgent", "Reporter"]
        );
    }
}
