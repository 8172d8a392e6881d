//! Z-score drift detection over the numeric columns of a dataset.
//!
//! For each watched column the maximum value is compared with the column
//! mean in units of sample standard deviation. Drift is advisory: the
//! detector never fails.

use std::collections::BTreeMap;

use crate::record::{Dataset, Metric};

/// Default z-score above which a column is flagged.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 3.0;

/// Columns watched for drift.
pub const DRIFT_COLUMNS: [Metric; 4] = [
    Metric::Spend,
    Metric::Frequency,
    Metric::Revenue,
    Metric::Ctr,
];

/// Column name -> human readable anomaly description.
pub type DriftReport = BTreeMap<String, String>;

/// Mean, sample standard deviation and extremes of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// `None` when the column has fewer than two values (deviation undefined).
    pub fn of(values: &[f64]) -> Option<ColumnStats> {
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(ColumnStats {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        })
    }

    /// Z-score of the column maximum, `None` for zero-variance columns.
    ///
    /// A constant column is zero-variance even when rounding in the mean
    /// leaves a tiny nonzero deviation.
    pub fn max_z_score(&self) -> Option<f64> {
        if self.max > self.min && self.std_dev > 0.0 {
            Some((self.max - self.mean) / self.std_dev)
        } else {
            None
        }
    }
}

/// Flag every watched column whose maximum lies more than `threshold`
/// standard deviations above its mean.
pub fn detect_drift(dataset: &Dataset, threshold: f64) -> DriftReport {
    let mut report = DriftReport::new();
    for metric in DRIFT_COLUMNS {
        let Some(stats) = ColumnStats::of(&dataset.column(metric)) else {
            continue;
        };
        let Some(z) = stats.max_z_score() else {
            continue;
        };
        if z > threshold {
            tracing::warn!(column = metric.column(), z_score = z, threshold, "drift detected");
            report.insert(
                metric.column().to_string(),
                format!("High Drift Detected (Z-Score: {:.2})", z),
            );
        }
    }
    report
}
