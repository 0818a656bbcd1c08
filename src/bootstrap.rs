//! Tracing initialization: stdout plus a non-blocking file appender.

use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Register the global subscriber. The returned guard must be kept alive
/// for the life of the process or buffered file output is lost.
pub fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    // Defaults to info; RUST_LOG overrides.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cfg!(debug_assertions) { "debug" } else { "info" })
    });

    let (file_writer, guard) = build_file_writer(log_file)?;

    let stdout_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_target(true)
        .with_writer(io::stdout);

    let file_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_target(true)
        .with_ansi(false)
        .with_writer(file_writer);

    registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn build_file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create log dir failed: {}", dir.display()))?;
        }
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file failed: {}", path.display()))?;

    Ok(tracing_appender::non_blocking(file))
}
