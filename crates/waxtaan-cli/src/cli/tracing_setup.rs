use std::fs::OpenOptions;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log to stderr, filtered by `RUST_LOG` (default `warn`). When
/// `WAXTAAN_LOG_FILE` is set, everything at debug and above also goes there.
pub fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        );
    let registry = tracing_subscriber::registry().with(stderr_layer);

    let Some(log_path) = std::env::var("WAXTAAN_LOG_FILE").ok() else {
        registry.init();
        return;
    };
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(LevelFilter::DEBUG);
            registry.with(file_layer).init();
        }
        Err(e) => {
            registry.init();
            tracing::warn!("cannot open log file {}: {}", log_path, e);
        }
    }
}
