mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use adpulse_workflow::CollaboratorKind;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Generation collaborator selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CollaboratorArg {
    Heuristic,
    Llm,
}

impl From<CollaboratorArg> for CollaboratorKind {
    fn from(arg: CollaboratorArg) -> Self {
        match arg {
            CollaboratorArg::Heuristic => CollaboratorKind::Heuristic,
            CollaboratorArg::Llm => CollaboratorKind::Llm,
        }
    }
}

/// Ad performance analysis and diagnosis workflow.
#[derive(Parser)]
#[command(
    name = "adpulse",
    version,
    about = "Ad performance analysis and diagnosis workflow"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full workflow for a question and write the final report
    Run {
        /// Question to diagnose, e.g. "Why did ROAS drop last week?"
        query: String,
        /// Dataset CSV (default: data_path from the config)
        #[arg(long)]
        data: Option<PathBuf>,
        /// TOML config file (default: ./adpulse.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory holding per-run log directories
        #[arg(long)]
        logs_dir: Option<PathBuf>,
        /// Shared path overwritten with the latest final report
        #[arg(long)]
        report: Option<PathBuf>,
        /// Generation collaborator
        #[arg(long, value_enum)]
        collaborator: Option<CollaboratorArg>,
        /// Model identifier for the llm collaborator
        #[arg(long)]
        model: Option<String>,
    },

    /// Validate a dataset and print its period-over-period analysis
    Analyze {
        /// Dataset CSV (default: data_path from the config)
        #[arg(long)]
        data: Option<PathBuf>,
        /// TOML config file (default: ./adpulse.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Z-score above which a column is reported as drifting
        #[arg(long)]
        threshold: Option<f64>,
        /// Length of the current window in days
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        window_days: Option<i64>,
    },

    /// Check a dataset against the record schema
    Validate {
        /// Dataset CSV
        path: PathBuf,
    },

    /// Write the synthetic ad-fatigue dataset
    Generate {
        /// Output CSV path
        #[arg(long, default_value = "data/synthetic_fb_data.csv")]
        out: PathBuf,
        /// Number of daily rows
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Date of the last row, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        end_date: Option<String>,
        /// Seed for the spend jitter
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Relative spend jitter in [0, 1)
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            query,
            data,
            config,
            logs_dir,
            report,
            collaborator,
            model,
        } => {
            let overrides = commands::run::RunOverrides {
                data,
                logs_dir,
                report,
                collaborator: collaborator.map(CollaboratorKind::from),
                model,
            };
            commands::run::cmd_run(&query, config.as_deref(), overrides, cli.output, cli.quiet);
        }
        Commands::Analyze {
            data,
            config,
            threshold,
            window_days,
        } => {
            commands::analyze::cmd_analyze(
                data,
                config.as_deref(),
                threshold,
                window_days,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { path } => {
            commands::validate::cmd_validate(&path, cli.output, cli.quiet);
        }
        Commands::Generate {
            out,
            days,
            end_date,
            seed,
            noise,
        } => {
            commands::generate::cmd_generate(
                &out,
                days,
                end_date.as_deref(),
                seed,
                noise,
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Report an error to stderr in the requested format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
