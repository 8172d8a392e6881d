use std::path::{Path, PathBuf};
use std::process;

use adpulse_core::{analyze_file, CoreError};

use crate::config::load_config;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_analyze(
    data: Option<PathBuf>,
    config_path: Option<&Path>,
    threshold: Option<f64>,
    window_days: Option<i64>,
    output: OutputFormat,
    quiet: bool,
) {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut options = config.analysis_options();
    if let Some(t) = threshold {
        options.drift_threshold = t;
    }
    if let Some(days) = window_days {
        options.current_window_days = days;
    }
    let path = data.unwrap_or(config.data_path);

    let analysis = match analyze_file(&path, &options) {
        Ok(a) => a,
        Err(e @ CoreError::InvalidWindow { .. }) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("Data Governance Failure: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(&analysis),
        OutputFormat::Text => serde_json::to_string_pretty(&analysis),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
