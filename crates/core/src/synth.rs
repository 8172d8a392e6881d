//! Synthetic "ad fatigue" dataset: frequency climbs day over day while
//! click-through rate decays, so revenue falls at constant spend.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::{Date, Duration};

use crate::delta::round2;
use crate::error::CoreError;
use crate::record::{Dataset, Record};

/// Parameters of the generated scenario.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Number of daily rows.
    pub days: u32,
    /// Date of the last row.
    pub end_date: Date,
    pub campaign_name: String,
    pub adset_name: String,
    /// Daily spend before noise.
    pub daily_spend: f64,
    /// Relative spend jitter in `[0, 1)`; 0 produces the exact ramp.
    pub noise: f64,
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn new(end_date: Date) -> Self {
        SyntheticConfig {
            days: 30,
            end_date,
            campaign_name: "Prospecting_USA".to_string(),
            adset_name: "Broad_Targeting".to_string(),
            daily_spend: 1000.0,
            noise: 0.0,
            seed: 42,
        }
    }
}

/// Cost per thousand impressions used to derive impressions from spend.
const CPM: f64 = 20.0;
/// Revenue per click.
const REVENUE_PER_CLICK: f64 = 2.5 * 60.0;

/// Generate the fatigue scenario described by `config`.
///
/// Fails with [`CoreError::DateOutOfRange`] when the first day would fall
/// before [`Date::MIN`].
pub fn fatigue_scenario(config: &SyntheticConfig) -> Result<Dataset, CoreError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let days = i64::from(config.days);
    let start = config
        .end_date
        .checked_sub(Duration::days((days - 1).max(0)))
        .ok_or(CoreError::DateOutOfRange {
            days: config.days,
            end_date: config.end_date,
        })?;

    let dataset = (0..days)
        .map(|i| {
            let date = start + Duration::days(i);
            let frequency = round2(1.2 + i as f64 * 0.08);
            let ctr = (0.025 - i as f64 * 0.0006).max(0.005);

            let jitter = if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            };
            let spend = round2(config.daily_spend * (1.0 + jitter));
            let impressions = (spend / CPM * 1000.0) as i64;
            let clicks = (impressions as f64 * ctr) as i64;

            Record {
                date,
                campaign_name: config.campaign_name.clone(),
                adset_name: config.adset_name.clone(),
                spend,
                impressions,
                clicks,
                frequency,
                revenue: round2(clicks as f64 * REVENUE_PER_CLICK),
            }
        })
        .collect();
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_dataset, AnalysisOptions};
    use crate::validate::validate_dataset;
    use time::macros::date;

    #[test]
    fn default_scenario_shape() {
        let ds = fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30))).unwrap();
        assert_eq!(ds.len(), 30);

        let first = &ds.records()[0];
        let last = &ds.records()[29];
        assert_eq!(first.date, date!(2024 - 06 - 01));
        assert_eq!(last.date, date!(2024 - 06 - 30));
        assert_eq!(first.frequency, 1.2);
        assert_eq!(last.frequency, 3.52);
        assert_eq!(first.impressions, 50_000);
        assert_eq!(first.clicks, 1_250);
        assert_eq!(first.revenue, 187_500.0);
        assert!(last.ctr() < first.ctr());
    }

    #[test]
    fn generated_data_passes_validation() {
        let mut config = SyntheticConfig::new(date!(2024 - 06 - 30));
        config.noise = 0.2;
        assert!(validate_dataset(fatigue_scenario(&config).unwrap()).is_ok());
    }

    #[test]
    fn same_seed_same_data() {
        let mut config = SyntheticConfig::new(date!(2024 - 06 - 30));
        config.noise = 0.1;
        assert_eq!(fatigue_scenario(&config).unwrap(), fatigue_scenario(&config).unwrap());
        let varied = fatigue_scenario(&config).unwrap();
        assert!(varied.records().iter().any(|r| r.spend != 1000.0));
    }

    #[test]
    fn fatigue_shows_up_in_the_deltas() {
        let ds = fatigue_scenario(&SyntheticConfig::new(date!(2024 - 06 - 30))).unwrap();
        let analysis = analyze_dataset(ds, &AnalysisOptions::default()).unwrap();
        assert!(analysis.metrics.frequency.delta_percent > 0.0);
        assert!(analysis.metrics.ctr.delta_percent < 0.0);
        assert!(analysis.metrics.revenue.delta_percent < 0.0);
        assert_eq!(analysis.metrics.spend.delta_percent, 0.0);
        // a linear ramp is not an outlier
        assert!(!analysis.drift_warnings.contains_key("frequency"));
    }

    #[test]
    fn start_before_the_calendar_is_an_error() {
        let mut config = SyntheticConfig::new(date!(2024 - 06 - 30));
        config.days = 5_000_000;
        assert!(matches!(
            fatigue_scenario(&config),
            Err(CoreError::DateOutOfRange { days: 5_000_000, .. })
        ));

        config.days = 0;
        assert!(fatigue_scenario(&config).unwrap().is_empty());
    }
}
