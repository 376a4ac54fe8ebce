use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
const DEFAULT_FILTER: &str = "medallion_etl=info";

/// Console output plus a JSON file log rotated daily under `logs/`.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "medallion_etl.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the writer alive for the life of the process so buffered lines flush
    std::mem::forget(guard);
}
