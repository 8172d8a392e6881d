use std::path::Path;
use std::process;

use time::macros::format_description;
use time::{Date, OffsetDateTime};

use adpulse_core::{fatigue_scenario, save_csv, SyntheticConfig};

use crate::{report_error, OutputFormat};

fn parse_end_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid --end-date '{}': {}", s, e))
}

pub(crate) fn cmd_generate(
    out: &Path,
    days: u32,
    end_date: Option<&str>,
    seed: u64,
    noise: f64,
    output: OutputFormat,
    quiet: bool,
) {
    let end_date = match end_date.map(parse_end_date) {
        Some(Ok(d)) => d,
        Some(Err(msg)) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
        None => OffsetDateTime::now_utc().date(),
    };
    if days == 0 {
        report_error("error: --days must be at least 1", output, quiet);
        process::exit(1);
    }
    if !(0.0..1.0).contains(&noise) {
        report_error("error: --noise must be in [0, 1)", output, quiet);
        process::exit(1);
    }

    let config = SyntheticConfig {
        days,
        seed,
        noise,
        ..SyntheticConfig::new(end_date)
    };
    let dataset = match fatigue_scenario(&config) {
        Ok(d) => d,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if let Err(e) = save_csv(&dataset, out) {
        report_error(&format!("error: {}", e), output, quiet);
        process::exit(1);
    }
    tracing::info!(path = %out.display(), records = dataset.len(), "synthetic dataset written");

    match output {
        OutputFormat::Text => {
            if !quiet {
                println!("wrote {} records to {}", dataset.len(), out.display());
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "path": out.display().to_string(),
                    "records": dataset.len(),
                })
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn end_date_parsing() {
        assert_eq!(parse_end_date("2024-06-30").unwrap(), date!(2024 - 06 - 30));
        assert!(parse_end_date("30/06/2024").is_err());
    }
}
