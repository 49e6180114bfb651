//! Refactor actions for the line under the cursor.
//!
//! Every rule in [`REFACTOR_RULES`] whose trigger matches the trimmed line
//! yields one candidate, in table order. Candidates are insertions at the end
//! of the line; nothing is applied here.

use the_core::line_ending::LineEnding;
use tracing::debug;

use crate::{
  candidate::{
    Candidate,
    CandidateKind,
    InsertFormat,
  },
  catalog::REFACTOR_RULES,
  document::Document,
  position::Position,
  template,
};

pub fn resolve(doc: &Document, line: usize) -> template::Result<Vec<Candidate>> {
  let Some(line) = doc.line(line) else {
    return Ok(Vec::new());
  };

  let trimmed = line.trimmed();
  let anchor = Position::new(line.index, line.text.chars().count());
  let mut candidates = Vec::new();

  for rule in &REFACTOR_RULES {
    let Some(rendered) = rule.evaluate(trimmed)? else {
      continue;
    };
    candidates.push(Candidate {
      label:  rendered.title,
      text:   indent_block(&rendered.text, line.indent(), doc.line_ending()),
      anchor,
      end:    anchor,
      kind:   CandidateKind::Refactor,
      format: InsertFormat::PlainText,
      detail: Some(rule.name.to_string()),
    });
  }

  debug!(line = line.index, count = candidates.len(), "resolved refactor actions");
  Ok(candidates)
}

/// Prefixes every line of `text` with a line ending and `indent`, so the block
/// can be inserted right after the last char of an indented line.
pub fn indent_block(text: &str, indent: &str, line_ending: LineEnding) -> String {
  let mut out = String::with_capacity(text.len() + 8);
  for line in text.lines() {
    out.push_str(line_ending.as_str());
    out.push_str(indent);
    out.push_str(line);
  }
  out
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::template::has_markers;

  #[test]
  fn collection_line_yields_four_candidates() {
    let doc = Document::from("const elements = []");
    let candidates = resolve(&doc, 0).unwrap();
    assert_eq!(candidates.len(), 4);
    for candidate in &candidates {
      assert!(candidate.text.contains("elements"));
      assert!(!has_markers(&candidate.text));
      assert!(!has_markers(&candidate.label));
      assert!(candidate.is_insertion());
      assert_eq!(candidate.anchor, Position::new(0, 19));
    }
    assert!(candidates[0].text.contains("for (const element of elements)"));
    assert!(candidates[1].text.contains("elements.push(element);"));
    assert!(candidates[2].text.contains("if (elements)"));
    assert!(candidates[3].text.contains("elementKeys.get(elementA)"));
  }

  #[test]
  fn scalar_line_yields_guard_only() {
    let doc = Document::from("const isValid = x > 0");
    let candidates = resolve(&doc, 0).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].label, "Guard on `isValid`");
    assert_eq!(candidates[0].text, "\nif (isValid) {\n\t\n}");
  }

  #[test]
  fn no_match_is_empty() {
    let doc = Document::from("items.push(1);\n");
    assert!(resolve(&doc, 0).unwrap().is_empty());
    assert!(resolve(&doc, 7).unwrap().is_empty());
  }

  #[test]
  fn insertion_follows_indent_and_line_ending() {
    let doc = Document::from("function f() {\r\n  const boxes = load();\r\n}\r\n");
    let candidates = resolve(&doc, 1).unwrap();
    assert_eq!(candidates.len(), 4);
    assert_eq!(
      candidates[1].text,
      "\r\n  const box = null;\r\n  boxes.push(box);"
    );
    assert_eq!(candidates[1].anchor, Position::new(1, 23));
  }
}
