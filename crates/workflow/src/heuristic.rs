//! Offline collaborator that reasons directly over the analysis numbers.
//!
//! Hypothesis: the metric with the largest drop is the primary driver, the
//! strongest other movements are cited as evidence, and drift warnings are
//! attached as supporting signals. Validation re-reads every citation against
//! the analysis. Creatives are templated per driver.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use adpulse_core::delta::AVERAGED_METRICS;
use adpulse_core::{Analysis, Metric};

use crate::collaborator::GenerationCollaborator;
use crate::error::GenerationError;
use crate::state::Validation;

/// Smallest absolute delta, in percent, that counts as a real movement.
pub const DEFAULT_MIN_EFFECT_PERCENT: f64 = 1.0;

/// Number of metrics cited as evidence.
const MAX_EVIDENCE: usize = 4;

/// Direction of a metric's movement.
fn direction(delta_percent: f64) -> &'static str {
    if delta_percent > 0.0 {
        "increase"
    } else if delta_percent < 0.0 {
        "decrease"
    } else {
        "flat"
    }
}

fn parse_analysis(analysis_json: &str) -> Result<Analysis, GenerationError> {
    serde_json::from_str(analysis_json).map_err(GenerationError::Analysis)
}

/// `delta_percent` of a metric by its analysis name, ROAS included.
fn metric_delta(analysis: &Analysis, name: &str) -> Option<f64> {
    if name == "roas" {
        return Some(analysis.metrics.roas.delta_percent);
    }
    Metric::from_column(name).map(|m| analysis.metrics.get(m).delta_percent)
}

/// Every reported metric and its delta, in a fixed order.
fn all_deltas(analysis: &Analysis) -> Vec<(&'static str, f64)> {
    AVERAGED_METRICS
        .iter()
        .map(|m| (m.column(), analysis.metrics.get(*m).delta_percent))
        .chain(std::iter::once(("roas", analysis.metrics.roas.delta_percent)))
        .collect()
}

fn label(metric: &str) -> String {
    match metric {
        "ctr" => "CTR".to_string(),
        "roas" => "ROAS".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Deterministic [`GenerationCollaborator`] needing no network access.
#[derive(Debug, Clone)]
pub struct HeuristicCollaborator {
    pub min_effect_percent: f64,
}

impl Default for HeuristicCollaborator {
    fn default() -> Self {
        HeuristicCollaborator {
            min_effect_percent: DEFAULT_MIN_EFFECT_PERCENT,
        }
    }
}

impl HeuristicCollaborator {
    fn hypothesis(&self, query: &str, analysis: &Analysis, critique: Option<&str>) -> Value {
        let deltas = all_deltas(analysis);

        // Largest drop; with nothing falling, the largest movement of any sign.
        let driver = deltas
            .iter()
            .filter(|(_, d)| *d < 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .or_else(|| {
                deltas
                    .iter()
                    .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            })
            .copied()
            .unwrap_or(("roas", 0.0));

        let mut movers: Vec<(&str, f64)> = deltas
            .iter()
            .copied()
            .filter(|(name, d)| *name != driver.0 && d.abs() >= self.min_effect_percent)
            .collect();
        movers.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

        let evidence: Vec<Value> = std::iter::once(driver)
            .chain(movers)
            .take(MAX_EVIDENCE)
            .map(|(metric, delta)| {
                json!({
                    "metric": metric,
                    "direction": direction(delta),
                    "delta_percent": delta,
                })
            })
            .collect();

        let frequency = analysis.metrics.frequency.delta_percent;
        let ctr = analysis.metrics.ctr.delta_percent;
        let root_cause = if frequency > 0.0 && ctr < 0.0 {
            "Creative fatigue: the same audience sees the ads more often and engages less"
        } else if driver.1 < 0.0 {
            "Performance decline without a frequency build-up"
        } else {
            "No material decline detected"
        };

        let summary = format!(
            "{} shows a {} of {:.2}% in the current window versus baseline. {}.",
            label(driver.0),
            direction(driver.1),
            driver.1.abs(),
            root_cause
        );

        let confidence = (0.5 + driver.1.abs() / 100.0).min(0.95);
        let drift: Vec<&String> = analysis.drift_warnings.keys().collect();

        let mut hypothesis = json!({
            "query": query,
            "summary": summary,
            "primary_driver": driver.0,
            "root_cause": root_cause,
            "evidence": evidence,
            "drift_warnings": drift,
            "confidence": (confidence * 100.0).round() / 100.0,
        });
        if let Some(critique) = critique {
            hypothesis["addresses_critique"] = Value::String(critique.to_string());
        }
        hypothesis
    }

    fn check(&self, hypothesis: &Value, analysis: &Analysis) -> Validation {
        let mut problems = Vec::new();

        let evidence = hypothesis
            .get("evidence")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if evidence.is_empty() {
            problems.push("hypothesis cites no evidence".to_string());
        }

        let mut strongest = 0.0_f64;
        for item in evidence {
            let Some(metric) = item.get("metric").and_then(Value::as_str) else {
                problems.push("evidence item without a metric".to_string());
                continue;
            };
            let Some(actual) = metric_delta(analysis, metric) else {
                problems.push(format!("'{metric}' is not a reported metric"));
                continue;
            };
            strongest = strongest.max(actual.abs());

            let claimed = item.get("direction").and_then(Value::as_str).unwrap_or("");
            if claimed != direction(actual) {
                problems.push(format!(
                    "claims {metric} {claimed} but the delta is {actual:.2}%"
                ));
            }
        }

        for column in hypothesis
            .get("drift_warnings")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            if !analysis.drift_warnings.contains_key(column) {
                problems.push(format!("no drift was detected on '{column}'"));
            }
        }

        if !evidence.is_empty() && strongest < self.min_effect_percent {
            problems.push(format!(
                "no cited metric moved by at least {:.1}%",
                self.min_effect_percent
            ));
        }

        let mut extra = Map::new();
        extra.insert("checked_evidence".to_string(), json!(evidence.len()));

        if problems.is_empty() {
            Validation {
                is_valid: true,
                critique: "Every cited movement matches the analysis.".to_string(),
                extra,
            }
        } else {
            Validation {
                is_valid: false,
                critique: problems.join("; "),
                extra,
            }
        }
    }
}

fn creative_copy(driver: &str) -> (&'static str, &'static str) {
    match driver {
        "ctr" | "clicks" | "frequency" => (
            "Seen it before? Not like this.",
            "A fresh look at what you already love. New styles just landed.",
        ),
        "revenue" | "roas" => (
            "More value in every order",
            "Bundle up and save on the pieces our customers reorder most.",
        ),
        "impressions" | "spend" => (
            "Made for people like you",
            "Discover why thousands switched this season.",
        ),
        _ => (
            "Something new is here",
            "Take a look at this week's picks.",
        ),
    }
}

#[async_trait]
impl GenerationCollaborator for HeuristicCollaborator {
    async fn generate_hypothesis(
        &self,
        query: &str,
        analysis_json: &str,
        critique: Option<&str>,
    ) -> Result<Value, GenerationError> {
        let analysis = parse_analysis(analysis_json)?;
        Ok(self.hypothesis(query, &analysis, critique))
    }

    async fn validate_hypothesis(
        &self,
        hypothesis: &Value,
        analysis_json: &str,
    ) -> Result<Validation, GenerationError> {
        let analysis = parse_analysis(analysis_json)?;
        Ok(self.check(hypothesis, &analysis))
    }

    async fn generate_creatives(
        &self,
        hypothesis: &Value,
        variants: &[String],
    ) -> Result<Value, GenerationError> {
        let driver = hypothesis
            .get("primary_driver")
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::Malformed {
                what: "hypothesis",
                message: "missing 'primary_driver'".to_string(),
            })?;
        let (headline, primary_text) = creative_copy(driver);

        let creatives: Vec<Value> = variants
            .iter()
            .map(|variant| {
                json!({
                    "variant": variant,
                    "headline": headline,
                    "primary_text": primary_text,
                    "call_to_action": "Shop Now",
                    "addresses": driver,
                })
            })
            .collect();
        Ok(Value::Array(creatives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpulse_core::{analyze_dataset, fatigue_scenario, AnalysisOptions, SyntheticConfig};
    use time::macros::date;

    fn fatigue_analysis() -> Analysis {
        let ds = fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30))).unwrap();
        analyze_dataset(ds, &AnalysisOptions::default()).unwrap()
    }

    fn json_of(analysis: &Analysis) -> String {
        analysis.to_json().unwrap()
    }

    #[tokio::test]
    async fn fatigue_hypothesis_names_a_falling_driver() {
        let analysis = fatigue_analysis();
        let collab = HeuristicCollaborator::default();
        let h = collab
            .generate_hypothesis("Why did ROAS drop?", &json_of(&analysis), None)
            .await
            .unwrap();

        let driver = h["primary_driver"].as_str().unwrap();
        assert!(metric_delta(&analysis, driver).unwrap() < 0.0);
        assert!(h["root_cause"].as_str().unwrap().starts_with("Creative fatigue"));
        assert!(h["evidence"].as_array().unwrap().len() <= MAX_EVIDENCE);
        assert_eq!(h["evidence"][0]["metric"], driver);
        assert!(h.get("addresses_critique").is_none());
    }

    #[tokio::test]
    async fn own_hypothesis_passes_validation() {
        let analysis = json_of(&fatigue_analysis());
        let collab = HeuristicCollaborator::default();
        let h = collab.generate_hypothesis("q", &analysis, None).await.unwrap();
        let v = collab.validate_hypothesis(&h, &analysis).await.unwrap();
        assert!(v.is_valid, "{}", v.critique);
    }

    #[tokio::test]
    async fn wrong_direction_is_rejected() {
        let analysis = json_of(&fatigue_analysis());
        let h = json!({
            "evidence": [{"metric": "frequency", "direction": "decrease"}],
        });
        let v = HeuristicCollaborator::default()
            .validate_hypothesis(&h, &analysis)
            .await
            .unwrap();
        assert!(!v.is_valid);
        assert!(v.critique.contains("claims frequency decrease"), "{}", v.critique);
    }

    #[tokio::test]
    async fn unknown_metric_and_missing_evidence_are_rejected() {
        let analysis = json_of(&fatigue_analysis());
        let collab = HeuristicCollaborator::default();

        let v = collab
            .validate_hypothesis(&json!({"evidence": [{"metric": "cpm"}]}), &analysis)
            .await
            .unwrap();
        assert!(v.critique.contains("'cpm' is not a reported metric"));

        let v = collab.validate_hypothesis(&json!({}), &analysis).await.unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.critique, "hypothesis cites no evidence");
    }

    #[tokio::test]
    async fn flat_data_never_validates() {
        let ds = adpulse_core::Dataset::new(
            fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30)))
                .unwrap()
                .into_records()
                .into_iter()
                .map(|mut r| {
                    r.frequency = 2.0;
                    r.clicks = 1_000;
                    r.revenue = 150_000.0;
                    r
                })
                .collect(),
        );
        let analysis = json_of(&analyze_dataset(ds, &AnalysisOptions::default()).unwrap());
        let collab = HeuristicCollaborator::default();

        let h = collab.generate_hypothesis("q", &analysis, Some("too vague")).await.unwrap();
        assert_eq!(h["addresses_critique"], "too vague");
        let v = collab.validate_hypothesis(&h, &analysis).await.unwrap();
        assert!(!v.is_valid);
        assert!(v.critique.contains("no cited metric moved"));
    }

    #[tokio::test]
    async fn one_creative_per_variant() {
        let variants = vec!["A".to_string(), "B".to_string()];
        let creatives = HeuristicCollaborator::default()
            .generate_creatives(&json!({"primary_driver": "ctr"}), &variants)
            .await
            .unwrap();
        let list = creatives.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["variant"], "B");
        assert_eq!(list[0]["addresses"], "ctr");
    }

    #[tokio::test]
    async fn garbage_analysis_is_an_error() {
        let err = HeuristicCollaborator::default()
            .generate_hypothesis("q", "not json", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Analysis(_)));
    }

    #[test]
    fn labels() {
        assert_eq!(label("ctr"), "CTR");
        assert_eq!(label("frequency"), "Frequency");
    }
}
