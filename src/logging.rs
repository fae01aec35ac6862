use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// Diagnostics go to stderr; every `warn` and `error` is also appended,
/// timestamped, to `error_log`.
pub fn init(verbose: bool, error_log: &Path) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new()
        .with_target("network_logger", level)
        .with_target("sqlx", LevelFilter::WARN);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(error_log)
        .with_context(|| format!("could not open error log {}", error_log.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false)
                .with_filter(filter),
        )
        .with(error_log_layer(Mutex::new(file)))
        .try_init()
        .context("a global subscriber is already installed")?;

    Ok(())
}

/// One timestamped line per `warn` or `error` event, written to `writer`
pub fn error_log_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::WARN)
}
