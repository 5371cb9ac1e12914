//! Logging and tracing initialization.
//!
//! A bare level such as `debug` applies to the Recast crates only. Everything
//! else (tokio, the subscriber itself) stays at `warn` so engine runs are
//! not buried under dependency noise. A level that already carries
//! directives is used as written.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Log targets owned by this workspace.
pub const RECAST_TARGETS: &[&str] = &[
    "recast",
    "recast_common",
    "recast_export_model",
    "recast_pipeline_compiler",
    "recast_render_engine",
];

/// Expand a configured level into filter directives.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }

    let level = if level.is_empty() { "info" } else { level };
    std::iter::once("warn".to_string())
        .chain(RECAST_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&config.level)))
        .unwrap_or_else(|e| {
            eprintln!("Invalid log level {:?} ({e}); using info", config.level);
            EnvFilter::new(filter_directives("info"))
        })
}

/// Initialize the tracing subscriber. Logs go to stderr so command output on
/// stdout stays clean.
///
/// `RUST_LOG` takes precedence over the configured level. Later calls are
/// ignored.
pub fn init_logging(config: &LoggingConfig) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(build_filter(config))
        .with_writer(std::io::stderr);

    if config.json {
        let subscriber = builder.json().with_current_span(false).finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = builder.with_target(true).with_thread_ids(false).finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}
