use std::collections::HashSet;

use serde_json::{
  Value,
  json,
};

use crate::{
  command::ScribeCommand,
  editing::{
    ANNOTATE_KIND,
    REFACTOR_KIND,
  },
};

/// What the server advertises in its `initialize` result.
pub fn server_capabilities() -> Value {
  json!({
    "textDocumentSync": {
      "openClose": true,
      // Incremental
      "change": 2,
    },
    "completionProvider": {
      "triggerCharacters": ["."],
      "resolveProvider": false,
    },
    "codeActionProvider": {
      "codeActionKinds": [REFACTOR_KIND, ANNOTATE_KIND],
    },
    "renameProvider": true,
    "executeCommandProvider": {
      "commands": ScribeCommand::NAMES,
    },
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCapability {
  SnippetCompletion,
  ApplyEdit,
  CodeActionLiterals,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientCapabilities {
  raw:       Value,
  supported: HashSet<ClientCapability>,
}

impl ClientCapabilities {
  pub fn from_raw(raw: Value) -> Self {
    let mut supported = HashSet::new();

    if capability_present(&raw, &[
      "textDocument",
      "completion",
      "completionItem",
      "snippetSupport",
    ]) {
      supported.insert(ClientCapability::SnippetCompletion);
    }
    if capability_present(&raw, &["workspace", "applyEdit"]) {
      supported.insert(ClientCapability::ApplyEdit);
    }
    if capability_present(&raw, &[
      "textDocument",
      "codeAction",
      "codeActionLiteralSupport",
    ]) {
      supported.insert(ClientCapability::CodeActionLiterals);
    }

    Self { raw, supported }
  }

  pub fn raw(&self) -> &Value {
    &self.raw
  }

  pub fn supports(&self, capability: ClientCapability) -> bool {
    self.supported.contains(&capability)
  }
}

fn capability_present(raw: &Value, path: &[&str]) -> bool {
  let found = path
    .iter()
    .try_fold(raw, |value, key| value.get(key));
  match found {
    Some(Value::Bool(enabled)) => *enabled,
    Some(Value::Null) | None => false,
    Some(_) => true,
  }
}
