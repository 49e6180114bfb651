//! Contracts for the services a host editor provides, plus textual fallbacks.
//!
//! A real host answers these from its language tooling. When it has none, the
//! [`TextualReferences`] and [`DeclarationSymbols`] providers scan the buffer
//! for whole-word matches and declaration shapes instead.

use the_core::chars::{
  char_is_word,
  word_around,
};
use thiserror::Error;

use crate::{
  Tendril,
  catalog::Trigger,
  comment::is_line_comment,
  document::Document,
  position::Position,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
  #[error("no identifier at {}:{}", .0.row, .0.col)]
  NoIdentifier(Position),
  #[error("{service} is unavailable: {reason}")]
  Unavailable {
    service: &'static str,
    reason:  String,
  },
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;

pub trait ReferenceProvider {
  /// Start positions of every reference to the identifier at `at`,
  /// including `at`'s own occurrence.
  fn references(&self, doc: &Document, at: Position) -> Result<Vec<Position>>;
}

pub trait SymbolProvider {
  /// Identifiers visible in `doc`, without duplicates.
  fn identifiers(&self, doc: &Document) -> Result<Vec<Tendril>>;
}

pub trait RenameExecutor {
  fn rename(&mut self, doc: &Document, at: Position, new_name: &str) -> Result<()>;
}

/// A rename the synchronizer asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
  pub at:       Position,
  pub new_name: Tendril,
}

/// Records requests so the caller can run them after the current batch.
impl RenameExecutor for Vec<RenameRequest> {
  fn rename(&mut self, _doc: &Document, at: Position, new_name: &str) -> Result<()> {
    self.push(RenameRequest {
      at,
      new_name: new_name.into(),
    });
    Ok(())
  }
}

/// The identifier under or touching `at`.
pub fn identifier_at(doc: &Document, at: Position) -> Option<String> {
  let line = doc.line(at.row)?;
  let chars: Vec<char> = line.text.chars().collect();
  let (start, end) = word_around(&chars, at.col)?;
  Some(chars[start..end].iter().collect())
}

/// Start positions of whole-word occurrences of `name` in code: comment lines
/// for `comment_token` and quoted text are skipped, while `${...}` holes in
/// template literals count as code.
pub fn occurrences(doc: &Document, name: &str, comment_token: &str) -> Vec<Position> {
  let needle: Vec<char> = name.chars().collect();
  if needle.is_empty() {
    return Vec::new();
  }
  let literals = doc.string_literals(comment_token);
  let quoted = |idx: usize| {
    literals
      .iter()
      .any(|&(start, end)| start <= idx && idx < end)
  };

  let mut found = Vec::new();
  for line in doc.lines() {
    if is_line_comment(&line.text, comment_token) {
      continue;
    }
    let line_start = doc.line_start(line.index);
    let chars: Vec<char> = line.text.chars().collect();
    let mut col = 0;
    while col + needle.len() <= chars.len() {
      let end = col + needle.len();
      let bounded = (col == 0 || !char_is_word(chars[col - 1]))
        && chars.get(end).is_none_or(|ch| !char_is_word(*ch));
      if bounded && chars[col..end] == needle[..] && !quoted(line_start + col) {
        found.push(Position::new(line.index, col));
        col = end;
      } else {
        col += 1;
      }
    }
  }
  found
}

/// Whole-word textual references, skipping comment lines.
#[derive(Debug, Clone)]
pub struct TextualReferences {
  pub comment_token: Tendril,
}

impl TextualReferences {
  pub fn new(comment_token: impl Into<Tendril>) -> Self {
    Self {
      comment_token: comment_token.into(),
    }
  }
}

impl ReferenceProvider for TextualReferences {
  fn references(&self, doc: &Document, at: Position) -> Result<Vec<Position>> {
    let name = identifier_at(doc, at).ok_or(CollaboratorError::NoIdentifier(at))?;
    Ok(occurrences(doc, &name, &self.comment_token))
  }
}

/// Names bound by declaration lines and `for...of` headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationSymbols;

impl SymbolProvider for DeclarationSymbols {
  fn identifiers(&self, doc: &Document) -> Result<Vec<Tendril>> {
    let mut names: Vec<Tendril> = Vec::new();
    for line in doc.lines() {
      let trimmed = line.trimmed();
      let captures = Trigger::Declaration
        .captures(trimmed)
        .or_else(|| Trigger::ForOf.captures(trimmed));
      let Some(name) = captures.as_ref().and_then(|captures| captures.text(0)) else {
        continue;
      };
      if !names.iter().any(|known| known == name) {
        names.push(name.into());
      }
    }
    Ok(names)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const SOURCE: &str = "// Let `items` be.\n\
                        const items = [];\n\
                        const itemsCount = items.length;\n\
                        for (const item of items) {\n\
                        \tlet total = item;\n\
                        }";

  #[test]
  fn textual_references_are_whole_words() {
    let doc = Document::from(SOURCE);
    let refs = TextualReferences::new("//")
      .references(&doc, Position::new(1, 8))
      .unwrap();
    assert_eq!(refs, vec![
      Position::new(1, 6),
      Position::new(2, 19),
      Position::new(3, 19),
    ]);
  }

  #[test]
  fn quoted_text_is_not_a_reference() {
    let doc = Document::from(
      "const items = [];\n\
       log(\"items\", 'items', items);\n\
       log(`items: ${items.length}`);",
    );
    assert_eq!(occurrences(&doc, "items", "//"), vec![
      Position::new(0, 6),
      Position::new(1, 22),
      Position::new(2, 14),
    ]);
  }

  #[test]
  fn references_need_an_identifier() {
    let doc = Document::from("  = ;");
    assert_eq!(
      TextualReferences::new("//")
        .references(&doc, Position::new(0, 0))
        .unwrap_err(),
      CollaboratorError::NoIdentifier(Position::new(0, 0))
    );
  }

  #[test]
  fn declaration_symbols() {
    let doc = Document::from(SOURCE);
    let names = DeclarationSymbols.identifiers(&doc).unwrap();
    assert_eq!(names, ["items", "itemsCount", "item", "total"]);
  }

  #[test]
  fn recorder_collects_requests() {
    let doc = Document::from("");
    let mut requests = Vec::new();
    requests
      .rename(&doc, Position::new(3, 11), "value")
      .unwrap();
    assert_eq!(requests, vec![RenameRequest {
      at:       Position::new(3, 11),
      new_name: "value".into(),
    }]);
  }
}
