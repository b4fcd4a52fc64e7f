use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "TABULATORD_LOG";

/// Installs the global subscriber. Writes to stderr: stdout carries IPC responses.
///
/// Filter resolution: `TABULATORD_LOG`, then `RUST_LOG`, then `info`.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}
