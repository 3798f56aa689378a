use std::fs;
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";

/// Initializes console and file logging for one pipeline stage.
///
/// File output goes to `logs/<stage>.log` as JSON lines. Keep the returned
/// guard alive until the process exits so buffered lines are flushed.
pub fn init_logging(stage: &str) -> WorkerGuard {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, format!("{stage}.log"));
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autos_prep=info"));

    // A second stage in the same process keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}

/// Span handed to a component at construction; everything it logs is
/// recorded inside it.
pub fn stage_span(stage: &'static str) -> Span {
    tracing::info_span!("stage", name = stage)
}
