//! Wire shapes for editing requests: incoming params and outgoing results.

use ropey::Rope;
use serde::Deserialize;
use serde_json::{
  Value,
  json,
};
use the_lib::{
  candidate::{
    Candidate,
    CandidateKind,
    InsertFormat,
  },
  transaction::Transaction,
};

use crate::text_sync::{
  ContentChange,
  LspPosition,
  LspRange,
  text_edits,
  to_lsp_position,
};

pub const REFACTOR_KIND: &str = "refactor.rewrite";
pub const ANNOTATE_KIND: &str = "source.insertAnnotations";

#[derive(Debug, Clone, Deserialize)]
pub struct TextDocumentIdentifier {
  pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
  pub uri:         String,
  pub language_id: String,
  pub version:     i32,
  pub text:        String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionedTextDocumentIdentifier {
  pub uri:     String,
  #[serde(default)]
  pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
  #[serde(default)]
  pub root_uri:               Option<String>,
  #[serde(default)]
  pub root_path:              Option<String>,
  #[serde(default)]
  pub initialization_options: Option<Value>,
  #[serde(default)]
  pub capabilities:           Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
  pub text_document: TextDocumentItem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
  pub text_document:   VersionedTextDocumentIdentifier,
  pub content_changes: Vec<ContentChange>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCloseParams {
  pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeActionContext {
  #[serde(default)]
  pub only: Option<Vec<String>>,
}

impl CodeActionContext {
  /// Whether a client filter admits `kind`: an entry equal to it or one of
  /// its dot-separated parents.
  pub fn admits(&self, kind: &str) -> bool {
    let Some(only) = &self.only else {
      return true;
    };
    only.iter().any(|filter| {
      kind == filter
        || kind
          .strip_prefix(filter.as_str())
          .is_some_and(|rest| rest.starts_with('.'))
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeActionParams {
  pub text_document: TextDocumentIdentifier,
  pub range:         LspRange,
  #[serde(default)]
  pub context:       CodeActionContext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
  pub text_document: TextDocumentIdentifier,
  pub position:      LspPosition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameParams {
  pub text_document: TextDocumentIdentifier,
  pub position:      LspPosition,
  pub new_name:      String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCommandParams {
  pub command:   String,
  #[serde(default)]
  pub arguments: Vec<Value>,
}

pub fn workspace_edit(uri: &str, old_text: &Rope, transaction: &Transaction) -> Value {
  json!({
    "changes": {
      uri: text_edits(old_text, transaction),
    }
  })
}

pub fn apply_edit_params(label: &str, edit: Value) -> Value {
  json!({
    "label": label,
    "edit": edit,
  })
}

pub fn code_action(title: &str, kind: &str, edit: Value, is_preferred: bool) -> Value {
  let mut action = json!({
    "title": title,
    "kind": kind,
    "edit": edit,
  });
  if is_preferred && let Some(action) = action.as_object_mut() {
    action.insert("isPreferred".into(), Value::Bool(true));
  }
  action
}

pub fn completion_list(items: Vec<Value>) -> Value {
  json!({
    "isIncomplete": false,
    "items": items,
  })
}

/// A completion item for `candidate`. Clients without snippet support get
/// the snippet with its tab stops flattened to plain text.
pub fn completion_item(text: &Rope, candidate: &Candidate, snippets: bool) -> Value {
  let (new_text, format) = match candidate.format {
    InsertFormat::Snippet if !snippets => {
      (plain_snippet(&candidate.text), InsertFormat::PlainText)
    },
    format => (candidate.text.clone(), format),
  };
  let range = LspRange {
    start: to_lsp_position(text, candidate.anchor),
    end:   to_lsp_position(text, candidate.end),
  };

  let mut item = json!({
    "label": candidate.label,
    "kind": completion_kind(candidate.kind),
    "insertTextFormat": insert_text_format(format),
    "textEdit": {
      "range": range.as_json(),
      "newText": new_text,
    },
  });
  let Some(fields) = item.as_object_mut() else {
    return item;
  };
  if let Some(detail) = &candidate.detail {
    fields.insert("detail".into(), json!(detail));
  }
  // Replacing text before the typed word: filter on what the range covers.
  if !candidate.is_insertion() {
    let from = the_lib::position::char_idx_at_coords(text.slice(..), candidate.anchor);
    let to = the_lib::position::char_idx_at_coords(text.slice(..), candidate.end);
    fields.insert("filterText".into(), json!(text.slice(from..to).to_string()));
  }
  item
}

fn completion_kind(kind: CandidateKind) -> u8 {
  match kind {
    CandidateKind::Method => 2,
    CandidateKind::Variable => 6,
    CandidateKind::Keyword => 14,
    CandidateKind::Snippet | CandidateKind::Refactor => 15,
  }
}

fn insert_text_format(format: InsertFormat) -> u8 {
  match format {
    InsertFormat::PlainText => 1,
    InsertFormat::Snippet => 2,
  }
}

/// Strips snippet syntax: `$1` and `$0` vanish, `${1:name}` becomes `name`,
/// `\$` becomes `$`.
pub fn plain_snippet(snippet: &str) -> String {
  let mut out = String::with_capacity(snippet.len());
  let mut chars = snippet.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '\\' => match chars.peek() {
        Some(&next) if matches!(next, '$' | '}' | '\\') => {
          out.push(next);
          chars.next();
        },
        _ => out.push(ch),
      },
      '$' => match chars.peek() {
        Some(next) if next.is_ascii_digit() => {
          while chars.peek().is_some_and(char::is_ascii_digit) {
            chars.next();
          }
        },
        Some('{') => {
          chars.next();
          while chars.peek().is_some_and(char::is_ascii_digit) {
            chars.next();
          }
          if chars.peek() == Some(&':') {
            chars.next();
          }
          for inner in chars.by_ref() {
            if inner == '}' {
              break;
            }
            out.push(inner);
          }
        },
        _ => out.push(ch),
      },
      _ => out.push(ch),
    }
  }
  out
}
