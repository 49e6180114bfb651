use serde_json::Value;
use thiserror::Error;

/// Commands reachable through `workspace/executeCommand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScribeCommand {
  InsertAnnotations {
    uri: String,
  },
  SyncAnnotations {
    uri: String,
    old: String,
    new: String,
  },
  GenerateUnitTest {
    text: String,
  },
  ArrayMethodCallback {
    text: String,
  },
  DeclarationAnnotation {
    text: String,
  },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
  #[error("unknown command: {0}")]
  Unknown(String),
  #[error("{command} expects a string argument at position {index}")]
  Argument {
    command: &'static str,
    index:   usize,
  },
}

impl ScribeCommand {
  pub const INSERT_ANNOTATIONS: &'static str = "scribe.insertAnnotations";
  pub const SYNC_ANNOTATIONS: &'static str = "scribe.syncAnnotations";
  pub const GENERATE_UNIT_TEST: &'static str = "scribe.generateUnitTest";
  pub const ARRAY_METHOD_CALLBACK: &'static str = "scribe.arrayMethodCallback";
  pub const DECLARATION_ANNOTATION: &'static str = "scribe.declarationAnnotation";

  pub const NAMES: [&'static str; 5] = [
    Self::INSERT_ANNOTATIONS,
    Self::SYNC_ANNOTATIONS,
    Self::GENERATE_UNIT_TEST,
    Self::ARRAY_METHOD_CALLBACK,
    Self::DECLARATION_ANNOTATION,
  ];

  pub fn parse(command: &str, arguments: &[Value]) -> Result<Self, CommandError> {
    let Some(&name) = Self::NAMES.iter().find(|name| **name == command) else {
      return Err(CommandError::Unknown(command.to_string()));
    };
    let arg = |index: usize| -> Result<String, CommandError> {
      arguments
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CommandError::Argument {
          command: name,
          index,
        })
    };

    Ok(match name {
      Self::INSERT_ANNOTATIONS => Self::InsertAnnotations { uri: arg(0)? },
      Self::SYNC_ANNOTATIONS => {
        Self::SyncAnnotations {
          uri: arg(0)?,
          old: arg(1)?,
          new: arg(2)?,
        }
      },
      Self::GENERATE_UNIT_TEST => Self::GenerateUnitTest { text: arg(0)? },
      Self::ARRAY_METHOD_CALLBACK => Self::ArrayMethodCallback { text: arg(0)? },
      _ => Self::DeclarationAnnotation { text: arg(0)? },
    })
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::InsertAnnotations { .. } => Self::INSERT_ANNOTATIONS,
      Self::SyncAnnotations { .. } => Self::SYNC_ANNOTATIONS,
      Self::GenerateUnitTest { .. } => Self::GENERATE_UNIT_TEST,
      Self::ArrayMethodCallback { .. } => Self::ARRAY_METHOD_CALLBACK,
      Self::DeclarationAnnotation { .. } => Self::DECLARATION_ANNOTATION,
    }
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;

  #[test]
  fn parses_positional_arguments() {
    let command = ScribeCommand::parse("scribe.syncAnnotations", &[
      json!("file:///a.js"),
      json!("elements"),
      json!("values"),
    ])
    .unwrap();
    assert_eq!(command, ScribeCommand::SyncAnnotations {
      uri: "file:///a.js".into(),
      old: "elements".into(),
      new: "values".into(),
    });
    assert_eq!(command.name(), ScribeCommand::SYNC_ANNOTATIONS);
  }

  #[test]
  fn rejects_bad_input() {
    assert_eq!(
      ScribeCommand::parse("scribe.nope", &[]),
      Err(CommandError::Unknown("scribe.nope".into()))
    );
    assert_eq!(
      ScribeCommand::parse("scribe.generateUnitTest", &[json!(1)]),
      Err(CommandError::Argument {
        command: ScribeCommand::GENERATE_UNIT_TEST,
        index:   0,
      })
    );
  }
}
