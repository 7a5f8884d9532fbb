//! File logging. The terminal belongs to the UI, so log lines go to a daily
//! rolling file in the data directory instead of stderr.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Overrides `logging.level` when set, e.g. `USERTAB_LOG=usertab=debug`
const LOG_ENV: &str = "USERTAB_LOG";
const LOG_FILE_PREFIX: &str = "usertab.log";

/// Install the global subscriber. Keep the guard alive for the whole run or
/// buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
  let dir = config.log_directory()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = match EnvFilter::try_from_env(LOG_ENV) {
    Ok(filter) => filter,
    Err(_) => parse_level(&config.level)?,
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}

fn parse_level(level: &str) -> Result<EnvFilter> {
  EnvFilter::try_new(level).map_err(|e| eyre!("Invalid logging.level {:?}: {}", level, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_level() {
    assert!(parse_level("info").is_ok());
    assert!(parse_level("usertab=debug,warn").is_ok());
    assert!(parse_level("usertab=loud").is_err());
  }
}
