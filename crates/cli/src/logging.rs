use sommelier_core::config::LoggingConfig;

/// Installs the stderr subscriber; stdout is reserved for command output.
/// A second call is a no-op.
pub fn init(config: &LoggingConfig) {
    use sommelier_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "sommelier.logging.reused", "subscriber already installed");
    }
}
