use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "LEDGERBOOK_LOG";

/// Installs the stderr subscriber. `LEDGERBOOK_LOG` wins over the configured level.
pub fn init(fallback_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests driving `run` twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
