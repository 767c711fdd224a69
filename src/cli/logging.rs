use tracing_subscriber::{fmt, EnvFilter};

use super::CliError;

/// Filter directive for a `--debug` level.
pub fn level_directive(debug_level: u8) -> &'static str {
    match debug_level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `debug_level` when set.
pub fn init_logging(debug_level: u8) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level_directive(debug_level))
            .map_err(|e| CliError::Usage(format!("invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|_| CliError::Usage("logging already initialized".into()))
}
