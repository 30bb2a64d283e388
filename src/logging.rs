use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log location: $XDG_DATA_HOME/stockroom/stockroom.log
pub fn default_log_file() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("stockroom")
    .join("stockroom.log")
}

/// Map `-v` repetitions to a level for this crate
fn level_for(verbose: u8) -> &'static str {
  match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  }
}

/// Set up file-based tracing.
///
/// Nothing may be written to stdout/stderr while the TUI owns the terminal.
/// The returned guard must live until exit so buffered lines are flushed.
pub fn init(log_file: &Path, verbose: u8) -> Result<WorkerGuard> {
  let dir = log_file
    .parent()
    .ok_or_else(|| eyre!("Invalid log file path: {}", log_file.display()))?;
  let file_name = log_file
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", log_file.display()))?;

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(format!("stockroom={}", level_for(verbose))));

  let file_appender = tracing_appender::rolling::never(dir, file_name);
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
