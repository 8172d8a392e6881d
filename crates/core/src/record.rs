//! Ad performance records and the ordered dataset they form.

use serde::{Deserialize, Serialize};
use time::Date;

/// One row of advertising performance data.
///
/// Integer counters are signed so that negative values read from a file
/// survive parsing and are rejected by the validator with a row-level message.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: Date,
    pub campaign_name: String,
    pub adset_name: String,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub frequency: f64,
    pub revenue: f64,
}

impl Record {
    /// Click-through rate. Zero impressions count as one.
    pub fn ctr(&self) -> f64 {
        let impressions = if self.impressions == 0 {
            1
        } else {
            self.impressions
        };
        self.clicks as f64 / impressions as f64
    }

    /// Value of a numeric column by name.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Spend => self.spend,
            Metric::Impressions => self.impressions as f64,
            Metric::Clicks => self.clicks as f64,
            Metric::Frequency => self.frequency,
            Metric::Revenue => self.revenue,
            Metric::Ctr => self.ctr(),
        }
    }
}

/// Numeric columns of a [`Dataset`], including the derived click-through rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Spend,
    Impressions,
    Clicks,
    Frequency,
    Revenue,
    Ctr,
}

impl Metric {
    pub fn column(self) -> &'static str {
        match self {
            Metric::Spend => "spend",
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::Frequency => "frequency",
            Metric::Revenue => "revenue",
            Metric::Ctr => "ctr",
        }
    }

    /// Look up a metric from its column name.
    pub fn from_column(name: &str) -> Option<Metric> {
        match name {
            "spend" => Some(Metric::Spend),
            "impressions" => Some(Metric::Impressions),
            "clicks" => Some(Metric::Clicks),
            "frequency" => Some(Metric::Frequency),
            "revenue" => Some(Metric::Revenue),
            "ctr" => Some(Metric::Ctr),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Records ordered by date. Several records may share a date
/// (one per campaign/ad set, for example).
///
/// Each record remembers its position in the input it was built from, so
/// diagnostics can point at the original row after sorting.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    source_rows: Vec<usize>,
}

impl Dataset {
    /// Build a dataset, sorting records by date. The sort is stable so
    /// same-day rows keep their input order.
    pub fn new(records: Vec<Record>) -> Self {
        let mut indexed: Vec<(usize, Record)> = records.into_iter().enumerate().collect();
        indexed.sort_by_key(|(_, r)| r.date);
        let (source_rows, records) = indexed.into_iter().unzip();
        Dataset {
            records,
            source_rows,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records in date order, each paired with its input row index.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.source_rows.iter().copied().zip(self.records.iter())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest date in the dataset, `None` when empty.
    pub fn max_date(&self) -> Option<Date> {
        self.records.last().map(|r| r.date)
    }

    /// All values of one column, in dataset order.
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().map(|r| r.metric(metric)).collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

// Equality is over the records only; input order is provenance.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use time::Duration;

    /// A valid record `offset` days after 2024-03-01.
    pub fn record(offset: i64) -> Record {
        Record {
            date: time::macros::date!(2024 - 03 - 01) + Duration::days(offset),
            campaign_name: "Prospecting_USA".to_string(),
            adset_name: "Broad_Targeting".to_string(),
            spend: 1000.0,
            impressions: 50_000,
            clicks: 1_000,
            frequency: 1.5,
            revenue: 150_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn ctr_treats_zero_impressions_as_one() {
        let mut r = record(0);
        r.impressions = 0;
        r.clicks = 3;
        assert_eq!(r.ctr(), 3.0);

        r.impressions = 200;
        r.clicks = 5;
        assert!((r.ctr() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn dataset_orders_by_date_and_keeps_same_day_order() {
        let mut a = record(2);
        a.campaign_name = "a".to_string();
        let mut b = record(2);
        b.campaign_name = "b".to_string();
        let c = record(0);

        let ds = Dataset::new(vec![a, b, c]);
        let names: Vec<&str> = ds
            .records()
            .iter()
            .map(|r| r.campaign_name.as_str())
            .collect();
        assert_eq!(names, vec!["Prospecting_USA", "a", "b"]);
        assert_eq!(ds.max_date(), Some(record(2).date));

        let sources: Vec<usize> = ds.rows().map(|(row, _)| row).collect();
        assert_eq!(sources, vec![2, 0, 1]);
    }

    #[test]
    fn metric_column_names_round_trip() {
        for m in [
            Metric::Spend,
            Metric::Impressions,
            Metric::Clicks,
            Metric::Frequency,
            Metric::Revenue,
            Metric::Ctr,
        ] {
            assert_eq!(Metric::from_column(m.column()), Some(m));
        }
        assert_eq!(Metric::from_column("roas"), None);
    }
}
