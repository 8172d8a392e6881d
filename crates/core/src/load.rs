//! CSV ingest and export for [`Dataset`].
//!
//! Rows are first deserialized into [`CsvRow`] (all cells as text, so that a
//! bad cell yields a row/column-specific error) and then converted into typed
//! [`Record`]s. Range checks are left to the validator.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::error::CoreError;
use crate::record::{Dataset, Record};

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Column order used when writing a dataset.
pub const COLUMNS: [&str; 8] = [
    "date",
    "campaign_name",
    "adset_name",
    "spend",
    "impressions",
    "clicks",
    "frequency",
    "revenue",
];

/// One raw CSV row, exactly as it appears in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvRow {
    pub date: String,
    pub campaign_name: String,
    pub adset_name: String,
    pub spend: String,
    pub impressions: String,
    pub clicks: String,
    pub frequency: String,
    pub revenue: String,
}

impl CsvRow {
    fn into_record(self, row: usize) -> Result<Record, CoreError> {
        Ok(Record {
            date: parse_date(row, &self.date)?,
            campaign_name: self.campaign_name.trim().to_string(),
            adset_name: self.adset_name.trim().to_string(),
            spend: parse_real(row, "spend", &self.spend)?,
            impressions: parse_count(row, "impressions", &self.impressions)?,
            clicks: parse_count(row, "clicks", &self.clicks)?,
            frequency: parse_real(row, "frequency", &self.frequency)?,
            revenue: parse_real(row, "revenue", &self.revenue)?,
        })
    }

    fn from_record(record: &Record) -> Result<Self, CoreError> {
        let date = record.date.format(DATE_FORMAT).map_err(|e| CoreError::Parse {
            row: 0,
            column: "date",
            message: e.to_string(),
        })?;
        Ok(CsvRow {
            date,
            campaign_name: record.campaign_name.clone(),
            adset_name: record.adset_name.clone(),
            spend: record.spend.to_string(),
            impressions: record.impressions.to_string(),
            clicks: record.clicks.to_string(),
            frequency: record.frequency.to_string(),
            revenue: record.revenue.to_string(),
        })
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(row: usize, raw: &str) -> Result<Date, CoreError> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|e| CoreError::Parse {
        row,
        column: "date",
        message: format!("'{}' is not a YYYY-MM-DD date ({})", raw, e),
    })
}

fn parse_real(row: usize, column: &'static str, raw: &str) -> Result<f64, CoreError> {
    raw.trim().parse::<f64>().map_err(|_| CoreError::Parse {
        row,
        column,
        message: format!("'{}' is not a number", raw),
    })
}

/// Integer counters also accept whole-valued reals such as `1200.0`.
fn parse_count(row: usize, column: &'static str, raw: &str) -> Result<i64, CoreError> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(CoreError::Parse {
            row,
            column,
            message: format!("'{}' is not an integer", raw),
        }),
    }
}

/// Read a dataset from any reader producing CSV with a header row.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset, CoreError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (row, result) in rdr.deserialize::<CsvRow>().enumerate() {
        records.push(result?.into_record(row)?);
    }
    Ok(Dataset::new(records))
}

/// Load a dataset from a CSV file.
pub fn load_csv(path: &Path) -> Result<Dataset, CoreError> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let dataset = read_csv(file)?;
    tracing::debug!(path = %path.display(), records = dataset.len(), "loaded dataset");
    Ok(dataset)
}

/// Write a dataset as CSV (header row plus one line per record).
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<(), CoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in dataset.records() {
        wtr.serialize(CsvRow::from_record(record)?)?;
    }
    if dataset.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    wtr.flush().map_err(|e| CoreError::Csv(e.into()))?;
    Ok(())
}

/// Write a dataset to `path`, creating parent directories as needed.
pub fn save_csv(dataset: &Dataset, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| CoreError::io(path, e))?;
    write_csv(dataset, file)
}
