use clap::ArgMatches;
use service_metrics::{LogMessageCounter, LogSinkLayer};
use std::borrow::Borrow;
use tracing::metadata::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoggingStyle {
    /// Uses compact logging.
    Compact,
    /// Uses JSON formatted logging
    Json,
}

/// Initializes the tracing and logging system from arguments.
///
/// This method uses the default environment filter to configure logging.
/// Please use the `RUST_LOG` environment variable to tune.
///
/// ## Arguments
/// * `matches` - The clap argument matches.
/// * `log_counter` - Counts every record that passes the filter, if set.
pub fn initialize_from_matches<M: Borrow<ArgMatches>>(
    matches: M,
    log_counter: Option<LogSinkLayer<LogMessageCounter>>,
) {
    let style = matches
        .borrow()
        .get_one::<LoggingStyle>("logging_style")
        .copied()
        .unwrap_or(LoggingStyle::Compact);
    initialize(style, log_counter)
}

/// Initializes the tracing and logging system.
///
/// The log counter is added as a separate layer next to the formatter; both only
/// see records passing the environment filter.
///
/// ## Arguments
/// * `style` - The logging style to use.
/// * `log_counter` - Counts every record that passes the filter, if set.
pub fn initialize<S: Borrow<LoggingStyle>>(
    style: S,
    log_counter: Option<LogSinkLayer<LogMessageCounter>>,
) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let formatter = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(true)
        .with_target(true);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(log_counter);

    match style.borrow() {
        LoggingStyle::Compact => subscriber.with(formatter).init(),
        LoggingStyle::Json => subscriber.with(formatter.json()).init(),
    }
}
