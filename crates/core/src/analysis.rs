//! Packaging of the governance gate, drift check and delta computation into
//! the single analysis object handed to the workflow.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::delta::{DeltaCalculator, DeltaMetrics, DEFAULT_CURRENT_WINDOW_DAYS};
use crate::drift::{detect_drift, DriftReport, DEFAULT_DRIFT_THRESHOLD};
use crate::error::CoreError;
use crate::load::load_csv;
use crate::record::Dataset;
use crate::validate::validate_dataset;

/// Label describing the windows being compared.
pub const ANALYSIS_PERIOD: &str = "Last 7 Days vs Previous 30 Days";

/// Health-check status attached to every successful analysis.
pub const HEALTH_CHECK_PASSED: &str = "Passed";

/// Knobs for [`analyze_dataset`] and [`analyze_file`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    pub drift_threshold: f64,
    pub current_window_days: i64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
        }
    }
}

/// Result of analysing a validated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis_period: String,
    pub metrics: DeltaMetrics,
    pub drift_warnings: DriftReport,
    pub data_health_check: String,
}

impl Analysis {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Validate, check drift and compute deltas for an in-memory dataset.
///
/// Validation runs first; nothing else is computed for a rejected dataset.
pub fn analyze_dataset(dataset: Dataset, options: &AnalysisOptions) -> Result<Analysis, CoreError> {
    let dataset = validate_dataset(dataset)?;
    let drift_warnings = detect_drift(&dataset, options.drift_threshold);
    let metrics = DeltaCalculator::new(options.current_window_days)?.compute(&dataset)?;

    tracing::info!(
        records = dataset.len(),
        drift_warnings = drift_warnings.len(),
        roas_delta = metrics.roas.delta_percent,
        "analysis complete"
    );

    Ok(Analysis {
        analysis_period: ANALYSIS_PERIOD.to_string(),
        metrics,
        drift_warnings,
        data_health_check: HEALTH_CHECK_PASSED.to_string(),
    })
}

/// Load `path` as CSV and analyse it.
pub fn analyze_file(path: &Path, options: &AnalysisOptions) -> Result<Analysis, CoreError> {
    analyze_dataset(load_csv(path)?, options)
}
