//! Record-level schema validation: the governance gate every dataset passes
//! before any analysis runs.
//!
//! All rows are checked; the resulting error carries the first
//! [`MAX_REPORTED_VIOLATIONS`] messages and the total count.

use crate::error::{CoreError, MAX_REPORTED_VIOLATIONS};
use crate::record::{Dataset, Record};

/// Check a single record, returning one message per broken constraint.
pub fn check_record(record: &Record) -> Vec<String> {
    let mut problems = Vec::new();

    if record.campaign_name.trim().is_empty() {
        problems.push("campaign_name must not be empty".to_string());
    }
    if record.adset_name.trim().is_empty() {
        problems.push("adset_name must not be empty".to_string());
    }
    check_real(&mut problems, "spend", record.spend, 0.0);
    check_count(&mut problems, "impressions", record.impressions);
    check_count(&mut problems, "clicks", record.clicks);
    check_real(&mut problems, "frequency", record.frequency, 1.0);
    check_real(&mut problems, "revenue", record.revenue, 0.0);

    problems
}

fn check_real(problems: &mut Vec<String>, field: &str, value: f64, min: f64) {
    if !value.is_finite() {
        problems.push(format!("{} must be a finite number (got {})", field, value));
    } else if value < min {
        problems.push(format!("{} must be >= {} (got {})", field, min, value));
    }
}

fn check_count(problems: &mut Vec<String>, field: &str, value: i64) {
    if value < 0 {
        problems.push(format!("{} must be >= 0 (got {})", field, value));
    }
}

/// Validate every record of `dataset`.
///
/// Returns the dataset untouched when all rows conform, otherwise
/// [`CoreError::SchemaValidation`]. Rows are numbered by their position in
/// the input, not by date order.
pub fn validate_dataset(dataset: Dataset) -> Result<Dataset, CoreError> {
    let mut violations = Vec::new();
    let mut total = 0;

    for (row, record) in dataset.rows() {
        let problems = check_record(record);
        if problems.is_empty() {
            continue;
        }
        total += 1;
        if violations.len() < MAX_REPORTED_VIOLATIONS {
            violations.push(format!("Row {} Error: {}", row, problems.join("; ")));
        }
    }

    if total > 0 {
        tracing::warn!(
            violations = total,
            records = dataset.len(),
            "dataset rejected by schema validation"
        );
        return Err(CoreError::SchemaValidation { violations, total });
    }
    Ok(dataset)
}
