//! Tracing setup shared by the binaries.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Path of today's log file, `dir/<prefix>_<YYYYMMDD>.log`.
pub fn log_file_path(dir: &Path, prefix: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y%m%d");
    dir.join(format!("{prefix}_{date}.log"))
}

/// Install the global subscriber.
///
/// Everything at `RUST_LOG` (default `info`) is appended to today's log file
/// in `dir`; only warnings and errors reach stderr. Calling this twice keeps
/// the first subscriber.
pub fn init(dir: &Path, prefix: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = log_file_path(dir, prefix);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Arc::new(file))
        .with_filter(file_filter);

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(LevelFilter::WARN);

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    info!(path = %path.display(), "logging initialized");
    Ok(path)
}
