//! Logging initialization.
//!
//! Reads `RUST_LOG` (filter) and `LOG_FILE` (path) from env (e.g. via .env). With `LOG_FILE`
//! set, logs are appended there through a non-blocking writer; otherwise they go to stderr so
//! stdout carries only command output.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::log_format::RunScopedFormat;

const DEFAULT_FILTER: &str = "warn,freeroute=info,hyper_util=off";

/// Non-blocking appender for `path`. Dropping the guard flushes pending lines.
fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), Box<dyn std::error::Error>> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("LOG_FILE has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;
    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::never(dir, file_name),
    ))
}

/// Installs the global subscriber. Keep the returned guard alive until exit so buffered file
/// logs are flushed.
pub fn init() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    match std::env::var("LOG_FILE").ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            let path = Path::new(&path);
            let (writer, guard) = file_writer(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .event_format(RunScopedFormat::new())
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(file_layer).try_init()?;
            tracing::debug!(path = %path.display(), "freeroute logging to file");
            Ok(Some(guard))
        }
        None => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .event_format(RunScopedFormat::new())
                .with_writer(std::io::stderr)
                .with_filter(filter);
            tracing_subscriber::registry().with(stderr_layer).try_init()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_the_guard_flushes_file_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("freeroute.log");
        let (writer, guard) = file_writer(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(RunScopedFormat::new())
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(status = 503, "all models failed");
        });
        drop(guard);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("all models failed"));
        assert!(text.contains("status=503"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(file_writer(Path::new("/")).is_err());
    }
}
