use std::{
  path::Path,
  str::from_utf8,
};

use eyre::{
  Result,
  WrapErr,
};
use tracing::debug;

/// Merge depth shared by every config layer.
pub const MERGE_DEPTH: usize = 3;

/// Default built-in config.toml.
pub fn default_config() -> Result<toml::Value> {
  let default_config = include_bytes!("../config.toml");
  let config_str =
    from_utf8(default_config).wrap_err("built-in config.toml contains invalid UTF-8")?;
  toml::from_str(config_str).wrap_err("failed to parse built-in config.toml")
}

/// Reads one layer. A missing file is an empty layer, a malformed one an
/// error.
pub fn read_layer(file: &Path) -> Result<Option<toml::Value>> {
  let text = match std::fs::read_to_string(file) {
    Ok(text) => text,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
    Err(err) => {
      return Err(err).wrap_err_with(|| format!("failed to read {}", file.display()));
    },
  };
  let value =
    toml::from_str(&text).wrap_err_with(|| format!("failed to parse {}", file.display()))?;
  debug!(file = %file.display(), "loaded config layer");
  Ok(Some(value))
}

/// Built-in defaults, then the user file (or `explicit`), then the workspace
/// file, each merged onto the previous one.
pub fn load_config(workspace: Option<&Path>, explicit: Option<&Path>) -> Result<toml::Value> {
  let default = default_config()?;
  let user = explicit
    .map(Path::to_path_buf)
    .unwrap_or_else(crate::config_file);

  let layers = std::iter::once(user)
    .chain(workspace.map(crate::workspace_config_file))
    .map(|file| read_layer(&file))
    .collect::<Result<Vec<_>>>()?;

  Ok(
    layers
      .into_iter()
      .flatten()
      .fold(default, |a, b| crate::merge_toml_values(a, b, MERGE_DEPTH)),
  )
}
