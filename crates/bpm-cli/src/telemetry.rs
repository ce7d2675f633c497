//! Subscriber setup

use bpm_pipeline::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Environment variable holding `EnvFilter` directives
pub(crate) const LOG_ENV: &str = "BPM_LOG";

/// Install the global subscriber; logs go to stderr
pub(crate) fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        eprintln!("logging not initialized: {e}");
    }
}
