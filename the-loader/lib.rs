pub mod config;

use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

/// Directory holding the user's `config.toml` and the log file fallback.
const APP_DIR: &str = "the-scribe";

/// Per-workspace directory for a workspace `config.toml`.
pub const WORKSPACE_DIR: &str = ".the-scribe";

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_SCRIBE_CONFIG_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.config_dir().join(APP_DIR),
    Err(err) => {
      tracing::warn!(%err, "no config directory, using the working directory");
      PathBuf::from(WORKSPACE_DIR)
    },
  }
}

pub fn cache_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_SCRIBE_CACHE_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.cache_dir().join(APP_DIR),
    Err(_) => std::env::temp_dir().join(APP_DIR),
  }
}

pub fn config_file() -> PathBuf {
  config_dir().join("config.toml")
}

pub fn workspace_config_file(workspace: &Path) -> PathBuf {
  workspace.join(WORKSPACE_DIR).join("config.toml")
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("the-scribe.log")
}

/// Merge two TOML documents, merging values from `right` onto `left`
///
/// `merge_depth` sets the nesting depth up to which values are merged instead
/// of overridden.
///
/// When a table exists in both `left` and `right`, the merged table consists of
/// all keys in `left`'s table unioned with all keys in `right` with the values
/// of `right` being merged recursively onto values of `left`. Arrays whose
/// items carry a `name` key are merged item by item on that name.
///
/// `crate::merge_toml_values(a, b, 3)` combines, for example:
///
/// b:
/// ```toml
/// [rename]
/// max-depth = 2
/// ```
/// a:
/// ```toml
/// comment-token = "//"
/// [rename]
/// cascade = true
/// max-depth = 4
/// ```
///
/// into:
/// ```toml
/// comment-token = "//"
/// [rename]
/// cascade = true
/// max-depth = 2
/// ```
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  fn get_name(v: &Value) -> Option<&str> {
    v.get("name").and_then(Value::as_str)
  }

  match (left, right) {
    (Value::Array(mut left_items), Value::Array(right_items)) => {
      // Plain arrays (such as `languages`) are replaced wholesale.
      if merge_depth > 0 && right_items.iter().all(|item| get_name(item).is_some()) {
        left_items.reserve(right_items.len());
        for rvalue in right_items {
          let lvalue = get_name(&rvalue)
            .and_then(|rname| left_items.iter().position(|v| get_name(v) == Some(rname)))
            .map(|lpos| left_items.remove(lpos));
          let mvalue = match lvalue {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_items.push(mvalue);
        }
        Value::Array(left_items)
      } else {
        Value::Array(right_items)
      }
    },
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      if merge_depth > 0 {
        for (rname, rvalue) in right_map {
          match left_map.remove(&rname) {
            Some(lvalue) => {
              let merged_value = merge_toml_values(lvalue, rvalue, merge_depth - 1);
              left_map.insert(rname, merged_value);
            },
            None => {
              left_map.insert(rname, rvalue);
            },
          }
        }
        Value::Table(left_map)
      } else {
        Value::Table(right_map)
      }
    },
    (_, value) => value,
  }
}

/// Finds the workspace folder containing `dir`.
///
/// Searches upward from `dir` and returns the first directory that contains
/// `.git`, `.jj` or `.the-scribe`. If no workspace was found returns
/// `(dir, true)`, otherwise `(workspace, false)`.
pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(WORKSPACE_DIR).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

/// Like [`find_workspace_in`], starting at the working directory.
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let Ok(rest) = path.strip_prefix("~") else {
    return path.to_path_buf();
  };
  match etcetera::home_dir() {
    Ok(home) => home.join(rest),
    Err(_) => path.to_path_buf(),
  }
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}

#[cfg(test)]
mod merge_toml_tests {
  use toml::Value;

  use super::merge_toml_values;

  #[test]
  fn nested_tables_merge() {
    let base: Value = toml::from_str(
      r#"
        comment-token = "//"
        languages = ["javascript", "typescript"]
        [rename]
        cascade = true
        max-depth = 4
      "#,
    )
    .unwrap();
    let user: Value = toml::from_str(
      r#"
        languages = ["javascript"]
        [rename]
        max-depth = 2
      "#,
    )
    .unwrap();

    let merged = merge_toml_values(base, user, 3);
    assert_eq!(merged["comment-token"].as_str(), Some("//"));
    assert_eq!(merged["rename"]["cascade"].as_bool(), Some(true));
    assert_eq!(merged["rename"]["max-depth"].as_integer(), Some(2));
    assert_eq!(
      merged["languages"].as_array().unwrap(),
      &vec![Value::String("javascript".into())]
    );
  }

  #[test]
  fn named_items_merge_by_name() {
    let base: Value = toml::from_str(
      r#"
        [[language]]
        name = "javascript"
        comment-token = "//"
      "#,
    )
    .unwrap();
    let user: Value = toml::from_str(
      r#"
        [[language]]
        name = "javascript"
        enabled = false
      "#,
    )
    .unwrap();

    let merged = merge_toml_values(base, user, 3);
    let languages = merged["language"].as_array().unwrap();
    assert_eq!(languages.len(), 1);
    assert_eq!(languages[0]["comment-token"].as_str(), Some("//"));
    assert_eq!(languages[0]["enabled"].as_bool(), Some(false));
  }

  #[test]
  fn depth_zero_overrides() {
    let base: Value = toml::from_str("[rename]\ncascade = true").unwrap();
    let user: Value = toml::from_str("[rename]\nmax-depth = 1").unwrap();
    let merged = merge_toml_values(base, user, 1);
    assert_eq!(merged["rename"].get("cascade"), None);
  }
}
