use std::path::PathBuf;

use ropey::{
  Rope,
  RopeSlice,
};
use serde::Deserialize;
use serde_json::{
  Value,
  json,
};
use the_core::line_ending::line_end_char_index;
use the_lib::{
  Tendril,
  document::{
    Document,
    DocumentError,
  },
  position::Position,
  transaction::{
    Change,
    Transaction,
  },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LspPosition {
  pub line:      u32,
  pub character: u32,
}

impl LspPosition {
  pub fn as_json(self) -> Value {
    json!({
      "line": self.line,
      "character": self.character,
    })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LspRange {
  pub start: LspPosition,
  pub end:   LspPosition,
}

impl LspRange {
  pub fn as_json(self) -> Value {
    json!({
      "start": self.start.as_json(),
      "end": self.end.as_json(),
    })
  }
}

/// One entry of `didChange`'s `contentChanges`. Without a range the text
/// replaces the whole buffer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentChange {
  #[serde(default)]
  pub range: Option<LspRange>,
  pub text:  String,
}

pub fn path_for_file_uri(uri: &str) -> Option<PathBuf> {
  let parsed = url::Url::parse(uri).ok()?;
  if parsed.scheme() != "file" {
    return None;
  }
  parsed.to_file_path().ok()
}

pub fn char_idx_to_utf16_position(text: &Rope, pos: usize) -> LspPosition {
  let pos = pos.min(text.len_chars());
  let line = text.char_to_line(pos);
  let line_start = text.line_to_char(line);
  let character = text
    .slice(line_start..pos)
    .chars()
    .map(|ch| ch.len_utf16() as u32)
    .sum::<u32>();

  LspPosition {
    line: line as u32,
    character,
  }
}

pub fn utf16_position_to_char_idx(text: &Rope, position: LspPosition) -> usize {
  if text.len_chars() == 0 {
    return 0;
  }

  let line = (position.line as usize).min(text.len_lines().saturating_sub(1));
  let line_start = text.line_to_char(line);
  // A character past the line's end clamps before its terminator.
  let line_end = line_end_char_index(&text.slice(..), line);

  let mut utf16_count = 0u32;
  let mut char_idx = line_start;
  for ch in text.slice(line_start..line_end).chars() {
    let next = utf16_count.saturating_add(ch.len_utf16() as u32);
    if next > position.character {
      break;
    }
    utf16_count = next;
    char_idx = char_idx.saturating_add(1);
  }

  char_idx
}

/// Char-column position from a wire position.
pub fn to_position(text: &Rope, position: LspPosition) -> Position {
  let idx = utf16_position_to_char_idx(text, position);
  let line = text.char_to_line(idx);
  Position::new(line, idx - text.line_to_char(line))
}

/// Wire position from a char-column position.
pub fn to_lsp_position(text: &Rope, position: Position) -> LspPosition {
  let idx = the_lib::position::char_idx_at_coords(text.slice(..), position);
  char_idx_to_utf16_position(text, idx)
}

/// Applies `contentChanges` in order, each one against the result of the
/// previous.
pub fn apply_content_changes(
  doc: &mut Document,
  changes: &[ContentChange],
) -> Result<(), DocumentError> {
  for change in changes {
    let Some(range) = change.range else {
      let version = doc.version();
      *doc = Document::new(Rope::from(change.text.as_str())).with_version(version);
      continue;
    };

    let text = doc.text();
    let from = utf16_position_to_char_idx(text, range.start);
    let to = utf16_position_to_char_idx(text, range.end).max(from);
    let edit: Change = (from, to, Some(Tendril::from(change.text.as_str())));
    let transaction = Transaction::change(text, [edit])?;
    doc.apply(&transaction)?;
  }
  Ok(())
}

/// `TextEdit`s for a transaction, with ranges in `old_text` coordinates as a
/// `WorkspaceEdit` expects.
pub fn text_edits(old_text: &Rope, transaction: &Transaction) -> Vec<Value> {
  let old_slice = old_text.slice(..);
  transaction
    .changes_iter()
    .map(|(from, to, text)| {
      let start = char_idx_to_utf16_position(old_text, from);
      let end = traverse_utf16(start, old_slice.slice(from..to));
      json!({
        "range": LspRange { start, end }.as_json(),
        "newText": text.as_deref().unwrap_or_default(),
      })
    })
    .collect()
}

fn traverse_utf16(pos: LspPosition, text: RopeSlice<'_>) -> LspPosition {
  let LspPosition {
    mut line,
    mut character,
  } = pos;

  let mut chars = text.chars().peekable();
  while let Some(ch) = chars.next() {
    if ch == '\n' || ch == '\r' {
      if ch == '\r' && chars.peek() == Some(&'\n') {
        chars.next();
      }
      line += 1;
      character = 0;
    } else {
      character += ch.len_utf16() as u32;
    }
  }

  LspPosition { line, character }
}

#[cfg(test)]
mod test {
  use super::*;

  fn pos(line: u32, character: u32) -> LspPosition {
    LspPosition { line, character }
  }

  #[test]
  fn utf16_conversion_counts_surrogates() {
    let text = Rope::from("a😀b\nc");
    assert_eq!(utf16_position_to_char_idx(&text, pos(0, 3)), 2);
    assert_eq!(char_idx_to_utf16_position(&text, 2), pos(0, 3));
    assert_eq!(utf16_position_to_char_idx(&text, pos(1, 1)), 5);
    // Past the end clamps to the end of the buffer.
    assert_eq!(utf16_position_to_char_idx(&text, pos(9, 9)), 6);
    assert_eq!(to_position(&text, pos(0, 4)), Position::new(0, 3));
    assert_eq!(to_lsp_position(&text, Position::new(0, 3)), pos(0, 4));
  }

  #[test]
  fn oversized_character_stops_at_line_end() {
    let text = Rope::from("ab\r\ncd");
    assert_eq!(utf16_position_to_char_idx(&text, pos(0, 99)), 2);
    assert_eq!(utf16_position_to_char_idx(&text, pos(1, 99)), 6);

    let mut doc = Document::from("ab\ncd");
    let changes = [ContentChange {
      range: Some(LspRange {
        start: pos(0, 0),
        end:   pos(0, 99),
      }),
      text:  "X".into(),
    }];
    apply_content_changes(&mut doc, &changes).unwrap();
    assert_eq!(doc.text().to_string(), "X\ncd");
  }

  #[test]
  fn incremental_changes_apply_in_order() {
    let mut doc = Document::from("const items = [];\n");
    let changes = [
      ContentChange {
        range: Some(LspRange {
          start: pos(0, 6),
          end:   pos(0, 11),
        }),
        text:  "values".into(),
      },
      ContentChange {
        range: Some(LspRange {
          start: pos(1, 0),
          end:   pos(1, 0),
        }),
        text:  "values.push(1);".into(),
      },
    ];
    apply_content_changes(&mut doc, &changes).unwrap();
    assert_eq!(doc.text().to_string(), "const values = [];\nvalues.push(1);");
  }

  #[test]
  fn full_change_replaces_buffer() {
    let mut doc = Document::from("old").with_version(3);
    apply_content_changes(&mut doc, &[ContentChange {
      range: None,
      text:  "new\r\n".into(),
    }])
    .unwrap();
    assert_eq!(doc.text().to_string(), "new\r\n");
    assert_eq!(doc.version(), 3);
  }

  #[test]
  fn edits_use_old_coordinates() {
    let text = Rope::from("a\nbb\nccc");
    let transaction = Transaction::change(&text, [
      (0, 0, Some("// a\n".into())),
      (2, 4, Some("dd".into())),
      (5, 8, None),
    ])
    .unwrap();
    let edits = text_edits(&text, &transaction);
    assert_eq!(edits.len(), 3);
    assert_eq!(edits[0]["range"], LspRange::default().as_json());
    assert_eq!(edits[0]["newText"], "// a\n");
    assert_eq!(
      edits[1]["range"],
      LspRange {
        start: pos(1, 0),
        end:   pos(1, 2),
      }
      .as_json()
    );
    assert_eq!(edits[2]["range"]["end"], pos(2, 3).as_json());
    assert_eq!(edits[2]["newText"], "");
  }

  #[test]
  fn file_uris() {
    assert_eq!(
      path_for_file_uri("file:///tmp/app.js"),
      Some(PathBuf::from("/tmp/app.js"))
    );
    assert_eq!(path_for_file_uri("untitled:Untitled-1"), None);
  }
}
