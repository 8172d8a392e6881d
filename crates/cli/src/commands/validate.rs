use std::path::Path;
use std::process;

use adpulse_core::{load_csv, validate_dataset, CoreError};

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_validate(path: &Path, output: OutputFormat, quiet: bool) {
    let dataset = match load_csv(path) {
        Ok(d) => d,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let records = dataset.len();

    match validate_dataset(dataset) {
        Ok(_) => match output {
            OutputFormat::Text => {
                if !quiet {
                    println!("valid ({} records)", records);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "valid": true, "records": records }));
            }
        },
        Err(CoreError::SchemaValidation { violations, total }) => {
            match output {
                OutputFormat::Text => {
                    println!("Schema Validation Failed:");
                    for v in &violations {
                        println!("{}", v);
                    }
                    if total > violations.len() {
                        println!("... and {} more", total - violations.len());
                    }
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "valid": false,
                            "total": total,
                            "violations": violations,
                        })
                    );
                }
            }
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
