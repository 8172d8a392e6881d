use std::path::PathBuf;

/// Maximum number of violation messages carried by a schema failure.
pub const MAX_REPORTED_VIOLATIONS: usize = 5;

/// All errors produced while loading, validating or analysing a dataset.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// One or more records broke the schema. Only the first
    /// [`MAX_REPORTED_VIOLATIONS`] messages are kept; `total` counts all of them.
    #[error("Schema Validation Failed:\n{}", .violations.join("\n"))]
    SchemaValidation {
        violations: Vec<String>,
        total: usize,
    },

    /// The dataset file could not be opened or written.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed delimited text (wrong column count, bad header, ...).
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A cell could not be converted to the column's type.
    #[error("row {row}: column '{column}': {message}")]
    Parse {
        row: usize,
        column: &'static str,
        message: String,
    },

    /// The dataset has no rows, so no reporting window can be derived.
    #[error("dataset is empty")]
    EmptyDataset,

    /// The current window length is below one day or too large to represent.
    #[error("current window must be a positive number of days that fits the calendar (got {days})")]
    InvalidWindow { days: i64 },

    /// The synthetic scenario would start before the earliest supported date.
    #[error("cannot generate {days} days ending {end_date}: start date is out of range")]
    DateOutOfRange { days: u32, end_date: time::Date },

    /// The analysis could not be encoded as JSON.
    #[error("cannot encode analysis: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the dataset itself was rejected by the governance gate.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, CoreError::SchemaValidation { .. })
    }
}
