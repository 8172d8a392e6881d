use tracing_subscriber::{prelude::*, EnvFilter};

/// Environment variable holding the log filter; falls back to `RUST_LOG`.
const LOG_ENV: &str = "ADPULSE_LOG";

/// Install the stderr log subscriber.
///
/// `--verbose` forces `debug`; otherwise the filter comes from the
/// environment, defaulting to `info` (`error` with `--quiet`).
pub(crate) fn init(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "info" }))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}
