use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid configuration: {0}")]
  Invalid(#[from] toml::de::Error),
  #[error("comment-token must not be blank")]
  BlankCommentToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ServerConfig {
  pub comment_token: String,
  pub languages:     Vec<String>,
  pub features:      Features,
  pub rename:        RenameConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Features {
  pub refactor:    bool,
  pub completion:  bool,
  pub annotations: bool,
  pub rename_sync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RenameConfig {
  /// Rename loop variables when their collection is renamed.
  pub cascade:   bool,
  /// How many cascade levels a single rename may reach.
  pub max_depth: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      comment_token: the_lib::comment::DEFAULT_COMMENT_TOKEN.to_string(),
      languages:     ["javascript", "typescript", "vue"]
        .into_iter()
        .map(String::from)
        .collect(),
      features:      Features::default(),
      rename:        RenameConfig::default(),
    }
  }
}

impl Default for Features {
  fn default() -> Self {
    Self {
      refactor:    true,
      completion:  true,
      annotations: true,
      rename_sync: true,
    }
  }
}

impl Default for RenameConfig {
  fn default() -> Self {
    Self {
      cascade:   true,
      max_depth: 4,
    }
  }
}

impl ServerConfig {
  pub fn from_toml(value: toml::Value) -> Result<Self, ConfigError> {
    let config: Self = value.try_into()?;
    if config.comment_token.trim().is_empty() {
      return Err(ConfigError::BlankCommentToken);
    }
    Ok(config)
  }

  /// File configuration with the client's `initializationOptions` merged on
  /// top. Options that are not valid TOML values are ignored.
  pub fn resolve(file: toml::Value, options: Option<&Value>) -> Result<Self, ConfigError> {
    let merged = match options.filter(|options| !options.is_null()) {
      Some(options) => {
        match toml::Value::try_from(options) {
          Ok(options) => {
            the_loader::merge_toml_values(file, options, the_loader::config::MERGE_DEPTH)
          },
          Err(err) => {
            warn!(%err, "ignoring initializationOptions");
            file
          },
        }
      },
      None => file,
    };
    Self::from_toml(merged)
  }

  pub fn handles_language(&self, language_id: &str) -> bool {
    self.languages.iter().any(|language| language == language_id)
  }
}
