use std::path::{Path, PathBuf};
use std::process;

use adpulse_storage::{render_report, FsRunLogger};
use adpulse_workflow::{build_collaborator, CollaboratorKind, DataSource, RunOutcome, Workflow};

use crate::config::load_config;
use crate::{report_error, OutputFormat};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub(crate) struct RunOverrides {
    pub data: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub collaborator: Option<CollaboratorKind>,
    pub model: Option<String>,
}

pub(crate) fn cmd_run(
    query: &str,
    config_path: Option<&Path>,
    overrides: RunOverrides,
    output: OutputFormat,
    quiet: bool,
) {
    let mut config = match load_config(config_path) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    if let Some(data) = overrides.data {
        config.data_path = data;
    }
    if let Some(logs_dir) = overrides.logs_dir {
        config.logs_dir = logs_dir;
    }
    if let Some(report) = overrides.report {
        config.shared_report_path = report;
    }
    if let Some(collaborator) = overrides.collaborator {
        config.collaborator = collaborator;
    }
    if let Some(model) = overrides.model {
        config.model = model;
    }

    let collaborator = match build_collaborator(&config) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let mut logger = match FsRunLogger::create(&config.logs_dir) {
        Ok(l) => l,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("error: cannot start runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let source = DataSource::Csv(config.data_path.clone());
    let workflow = Workflow::new(config, source, collaborator);

    match runtime.block_on(workflow.run(query, &mut logger)) {
        Ok(outcome) => print_outcome(&outcome, output, quiet),
        Err(e) => {
            report_error(&format!("error: run failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn print_outcome(outcome: &RunOutcome, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => match render_report(&outcome.report) {
            Ok(body) => print!("{}", body),
            Err(e) => {
                report_error(&format!("error: {}", e), output, quiet);
                process::exit(1);
            }
        },
        OutputFormat::Text => {
            let report = &outcome.report;
            println!("Run {}: {}", report.run_id, report.status);
            if quiet {
                return;
            }
            println!("Retries: {}", report.retry_count);
            if let Some(summary) = report.final_insight.get("summary").and_then(|s| s.as_str()) {
                println!("Insight: {}", summary);
            }
            if let Some(critique) = report.validation.get("critique").and_then(|c| c.as_str()) {
                println!("Validation: {}", critique);
            }
            if let Some(error) = &report.error_log {
                println!("Error: {}", error);
            }
            for path in &outcome.report_paths {
                println!("Report: {}", path.display());
            }
        }
    }
}
