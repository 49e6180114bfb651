//! Log setup. Stdout carries protocol frames, so logs go to stderr or a file.

use std::{
  fs::OpenOptions,
  path::Path,
  sync::Mutex,
};

use eyre::{
  Result,
  WrapErr,
  eyre,
};
use tracing_subscriber::EnvFilter;

/// Overrides the `-v` derived level, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "THE_SCRIBE_LOG";

pub fn level_for(verbosity: u8) -> &'static str {
  match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  }
}

pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
  let filter =
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false);

  match log_file {
    Some(path) => {
      the_loader::initialize_log_file(Some(path.to_path_buf()));
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(the_loader::log_file())
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
      builder
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
    },
    None => builder.with_writer(std::io::stderr).try_init(),
  }
  .map_err(|err| eyre!(err))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn verbosity_levels() {
    assert_eq!(level_for(0), "warn");
    assert_eq!(level_for(2), "debug");
    assert_eq!(level_for(9), "trace");
  }
}
