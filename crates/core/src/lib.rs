//! adpulse-core: ad performance data model and the analysis that gates the
//! workflow.
//!
//! Pipeline for one dataset:
//!
//! 1. [`load_csv`] -- read the delimited file into typed [`Record`]s
//! 2. [`validate_dataset`] -- reject the whole dataset on any schema violation
//! 3. [`detect_drift`] -- advisory z-score check per numeric column
//! 4. [`DeltaCalculator`] -- current vs baseline window deltas
//!
//! [`analyze_file`] and [`analyze_dataset`] run all four steps and package the
//! result as an [`Analysis`].

pub mod analysis;
pub mod delta;
pub mod drift;
pub mod error;
pub mod load;
pub mod record;
pub mod synth;
pub mod validate;

pub use analysis::{analyze_dataset, analyze_file, Analysis, AnalysisOptions};
pub use delta::{DeltaCalculator, DeltaMetrics, MetricDelta, RoasDelta};
pub use drift::{detect_drift, DriftReport, DEFAULT_DRIFT_THRESHOLD};
pub use error::CoreError;
pub use load::{load_csv, read_csv, save_csv, write_csv};
pub use record::{Dataset, Metric, Record};
pub use synth::{fatigue_scenario, SyntheticConfig};
pub use validate::validate_dataset;
