use crate::{
  document::Document,
  position::Position,
  transaction::Change,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
  Refactor,
  Method,
  Keyword,
  Snippet,
  Variable,
}

/// How a client should treat the inserted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFormat {
  PlainText,
  /// Editor snippet syntax with `$1`, `${1:name}` and `$0` tab stops.
  Snippet,
}

/// A rendered insertion and the span it replaces. `anchor == end` is a pure
/// insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
  pub label:  String,
  pub text:   String,
  pub anchor: Position,
  pub end:    Position,
  pub kind:   CandidateKind,
  pub format: InsertFormat,
  pub detail: Option<String>,
}

impl Candidate {
  pub fn is_insertion(&self) -> bool {
    self.anchor == self.end
  }

  /// The candidate as a change against `doc`.
  pub fn to_change(&self, doc: &Document) -> Change {
    (
      doc.char_idx(self.anchor),
      doc.char_idx(self.end),
      Some(self.text.as_str().into()),
    )
  }
}
