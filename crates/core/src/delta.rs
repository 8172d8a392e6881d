//! Period-over-period deltas between a trailing "current" window and the
//! baseline that precedes it.
//!
//! current  = rows with `date > max_date - window`
//! baseline = rows with `date <= max_date - window`
//!
//! Any delta or ratio with a non-positive denominator is reported as 0.
//! All outputs are rounded to two decimals.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::error::CoreError;
use crate::record::{Dataset, Metric, Record};

/// Default length of the current window, in days.
pub const DEFAULT_CURRENT_WINDOW_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// Metrics reported as window averages.
pub const AVERAGED_METRICS: [Metric; 6] = [
    Metric::Spend,
    Metric::Revenue,
    Metric::Clicks,
    Metric::Impressions,
    Metric::Frequency,
    Metric::Ctr,
];

/// Current vs baseline averages of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub current_avg: f64,
    pub baseline_avg: f64,
    pub delta_percent: f64,
}

/// Current vs baseline return on ad spend, from summed revenue and spend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoasDelta {
    pub current: f64,
    pub baseline: f64,
    pub delta_percent: f64,
}

/// Deltas for every averaged metric plus ROAS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaMetrics {
    pub spend: MetricDelta,
    pub revenue: MetricDelta,
    pub clicks: MetricDelta,
    pub impressions: MetricDelta,
    pub frequency: MetricDelta,
    pub ctr: MetricDelta,
    pub roas: RoasDelta,
}

impl DeltaMetrics {
    /// Averaged delta for `metric`.
    pub fn get(&self, metric: Metric) -> &MetricDelta {
        match metric {
            Metric::Spend => &self.spend,
            Metric::Revenue => &self.revenue,
            Metric::Clicks => &self.clicks,
            Metric::Impressions => &self.impressions,
            Metric::Frequency => &self.frequency,
            Metric::Ctr => &self.ctr,
        }
    }
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percent change from `baseline` to `current`; 0 when `baseline <= 0`.
pub fn percent_change(current: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (current - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

fn mean(rows: &[&Record], metric: Metric) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|r| r.metric(metric)).sum::<f64>() / rows.len() as f64
}

fn roas(rows: &[&Record]) -> f64 {
    let spend: f64 = rows.iter().map(|r| r.spend).sum();
    let revenue: f64 = rows.iter().map(|r| r.revenue).sum();
    if spend > 0.0 {
        revenue / spend
    } else {
        0.0
    }
}

/// Splits a dataset at `max_date - window_days`.
#[derive(Debug, Clone, Copy)]
pub struct DeltaCalculator {
    window: Duration,
}

impl Default for DeltaCalculator {
    fn default() -> Self {
        DeltaCalculator {
            window: Duration::days(DEFAULT_CURRENT_WINDOW_DAYS),
        }
    }
}

impl DeltaCalculator {
    /// Fails with [`CoreError::InvalidWindow`] unless `window_days` is at
    /// least 1 and representable as a [`Duration`].
    pub fn new(window_days: i64) -> Result<Self, CoreError> {
        if window_days < 1 {
            return Err(CoreError::InvalidWindow { days: window_days });
        }
        let window = window_days
            .checked_mul(SECONDS_PER_DAY)
            .map(Duration::seconds)
            .ok_or(CoreError::InvalidWindow { days: window_days })?;
        Ok(DeltaCalculator { window })
    }

    /// Last date that still belongs to the baseline window.
    pub fn cutoff(&self, dataset: &Dataset) -> Result<Date, CoreError> {
        let max_date = dataset.max_date().ok_or(CoreError::EmptyDataset)?;
        Ok(max_date.checked_sub(self.window).unwrap_or(Date::MIN))
    }

    pub fn compute(&self, dataset: &Dataset) -> Result<DeltaMetrics, CoreError> {
        let cutoff = self.cutoff(dataset)?;
        let (current, baseline): (Vec<&Record>, Vec<&Record>) =
            dataset.records().iter().partition(|r| r.date > cutoff);

        tracing::debug!(
            %cutoff,
            current = current.len(),
            baseline = baseline.len(),
            "split dataset into windows"
        );

        let averaged = |metric| {
            let current_avg = mean(&current, metric);
            let baseline_avg = mean(&baseline, metric);
            MetricDelta {
                current_avg: round2(current_avg),
                baseline_avg: round2(baseline_avg),
                delta_percent: round2(percent_change(current_avg, baseline_avg)),
            }
        };

        let current_roas = roas(&current);
        let baseline_roas = roas(&baseline);

        Ok(DeltaMetrics {
            spend: averaged(Metric::Spend),
            revenue: averaged(Metric::Revenue),
            clicks: averaged(Metric::Clicks),
            impressions: averaged(Metric::Impressions),
            frequency: averaged(Metric::Frequency),
            ctr: averaged(Metric::Ctr),
            roas: RoasDelta {
                current: round2(current_roas),
                baseline: round2(baseline_roas),
                delta_percent: round2(percent_change(current_roas, baseline_roas)),
            },
        })
    }
}
