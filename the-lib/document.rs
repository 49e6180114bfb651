//! Read access to one buffer snapshot.
//!
//! A [`Document`] owns the rope and answers the line level questions the
//! resolvers ask: which lines exist, what the line above says, whether a
//! line is already annotated, and whether an offset sits inside a template
//! literal. It holds no selection or history. Edits arrive as
//! [`Transaction`]s.
//!
//! ```
//! use the_lib::document::Document;
//!
//! let doc = Document::from("// Let `items` be.\nconst items = [];\n");
//! assert!(doc.is_annotated(1, "//"));
//! assert!(!doc.is_annotated(0, "//"));
//! assert_eq!(doc.line(1).unwrap().trimmed(), "const items = [];");
//! ```

use ropey::Rope;
use the_core::line_ending::{
  LineEnding,
  NATIVE_LINE_ENDING,
  auto_detect_line_ending,
  line_end_char_index,
  line_without_line_ending,
};
use thiserror::Error;

use crate::{
  comment::{
    indentation,
    is_line_comment,
  },
  position::{
    Position,
    char_idx_at_coords,
    coords_at_pos,
  },
  transaction::{
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// One line of a snapshot, without its line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  pub index: usize,
  pub text:  String,
}

impl Line {
  pub fn trimmed(&self) -> &str {
    self.text.trim()
  }

  pub fn indent(&self) -> &str {
    indentation(&self.text)
  }

  /// Char column where the trimmed text starts.
  pub fn indent_width(&self) -> usize {
    self.indent().chars().count()
  }
}

#[derive(Debug, Clone)]
pub struct Document {
  text:        Rope,
  line_ending: LineEnding,
  version:     i32,
}

impl Default for Document {
  fn default() -> Self {
    Self::new(Rope::new())
  }
}

impl From<&str> for Document {
  fn from(text: &str) -> Self {
    Self::new(Rope::from(text))
  }
}

impl Document {
  pub fn new(text: Rope) -> Self {
    let line_ending = auto_detect_line_ending(&text).unwrap_or(NATIVE_LINE_ENDING);
    Self {
      text,
      line_ending,
      version: 0,
    }
  }

  #[must_use]
  pub fn with_version(mut self, version: i32) -> Self {
    self.version = version;
    self
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  /// The line ending new lines should use, detected from the buffer.
  pub fn line_ending(&self) -> LineEnding {
    self.line_ending
  }

  pub fn version(&self) -> i32 {
    self.version
  }

  pub fn set_version(&mut self, version: i32) {
    self.version = version;
  }

  pub fn len_lines(&self) -> usize {
    self.text.len_lines()
  }

  pub fn line(&self, index: usize) -> Option<Line> {
    if index >= self.len_lines() {
      return None;
    }
    let slice = self.text.slice(..);
    Some(Line {
      index,
      text: line_without_line_ending(&slice, index).to_string(),
    })
  }

  pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
    (0..self.len_lines()).filter_map(|index| self.line(index))
  }

  /// The line above `index`. Line 0 has none.
  pub fn previous_line(&self, index: usize) -> Option<Line> {
    index.checked_sub(1).and_then(|prev| self.line(prev))
  }

  /// Whether the line above `index` is a comment for `token`.
  pub fn is_annotated(&self, index: usize, token: &str) -> bool {
    self
      .previous_line(index)
      .is_some_and(|line| is_line_comment(&line.text, token))
  }

  pub fn line_start(&self, index: usize) -> usize {
    self.text.line_to_char(index.min(self.len_lines().saturating_sub(1)))
  }

  /// Char index after the last char of line `index`, before its line ending.
  pub fn line_end(&self, index: usize) -> usize {
    let index = index.min(self.len_lines().saturating_sub(1));
    line_end_char_index(&self.text.slice(..), index)
  }

  pub fn char_idx(&self, position: Position) -> usize {
    char_idx_at_coords(self.text.slice(..), position)
  }

  pub fn position(&self, char_idx: usize) -> Position {
    coords_at_pos(self.text.slice(..), char_idx)
  }

  /// Char ranges of template literals, from an opening backtick to its
  /// closing backtick. Backticks behind an odd number of backslashes are
  /// escaped. An unclosed literal runs to the end of the buffer.
  pub fn template_literals(&self) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut open = None;
    let mut backslashes = 0usize;

    for (idx, ch) in self.text.chars().enumerate() {
      if ch == '`' && backslashes % 2 == 0 {
        match open.take() {
          Some(start) => regions.push((start, idx)),
          None => open = Some(idx),
        }
      }
      backslashes = if ch == '\\' { backslashes + 1 } else { 0 };
    }
    if let Some(start) = open {
      regions.push((start, self.text.len_chars()));
    }
    regions
  }

  /// Whether `char_idx` is inside a template literal: after its opening
  /// backtick and no later than its closing one.
  pub fn in_template_literal(&self, char_idx: usize) -> bool {
    self
      .template_literals()
      .into_iter()
      .any(|(start, end)| start < char_idx && char_idx <= end)
  }

  /// Half-open char ranges of quoted text, quotes included: `"..."`, `'...'`
  /// and template literals. A template literal is split around its `${...}`
  /// holes, so code inside a hole is outside every range. Quotes after
  /// `comment_token` or inside `/* */` do not open anything. A `"` or `'`
  /// string ends at the end of its line.
  pub fn string_literals(&self, comment_token: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = self.text.chars().collect();
    let token: Vec<char> = comment_token.chars().collect();
    let mut ranges = Vec::new();
    let mut holes: Vec<usize> = Vec::new();
    let mut state = Scan::Code;
    let mut start = 0;
    let mut idx = 0;

    while idx < chars.len() {
      let ch = chars[idx];
      let next = chars.get(idx + 1).copied();
      match state {
        Scan::Code => {
          match ch {
            _ if !token.is_empty() && chars[idx..].starts_with(&token) => {
              state = Scan::LineComment;
              idx += token.len() - 1;
            },
            '/' if next == Some('*') => {
              state = Scan::BlockComment;
              idx += 1;
            },
            '"' | '\'' => {
              state = Scan::Quoted(ch);
              start = idx;
            },
            '`' => {
              state = Scan::Template;
              start = idx;
            },
            '{' => {
              if let Some(depth) = holes.pop() {
                holes.push(depth + 1);
              }
            },
            '}' => {
              match holes.pop() {
                Some(0) => {
                  state = Scan::Template;
                  start = idx;
                },
                Some(depth) => holes.push(depth - 1),
                None => {},
              }
            },
            _ => {},
          }
        },
        Scan::Quoted(quote) => {
          match ch {
            '\\' => idx += 1,
            '\n' | '\r' => {
              ranges.push((start, idx));
              state = Scan::Code;
            },
            _ if ch == quote => {
              ranges.push((start, idx + 1));
              state = Scan::Code;
            },
            _ => {},
          }
        },
        Scan::Template => {
          match ch {
            '\\' => idx += 1,
            '`' => {
              ranges.push((start, idx + 1));
              state = Scan::Code;
            },
            '$' if next == Some('{') => {
              ranges.push((start, idx));
              holes.push(0);
              state = Scan::Code;
              idx += 1;
            },
            _ => {},
          }
        },
        Scan::LineComment => {
          if ch == '\n' {
            state = Scan::Code;
          }
        },
        Scan::BlockComment => {
          if ch == '*' && next == Some('/') {
            state = Scan::Code;
            idx += 1;
          }
        },
      }
      idx += 1;
    }

    if matches!(state, Scan::Quoted(_) | Scan::Template) {
      ranges.push((start, chars.len()));
    }
    ranges
  }

  pub fn apply(&mut self, transaction: &Transaction) -> Result<()> {
    transaction.apply(&mut self.text)?;
    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
enum Scan {
  Code,
  Quoted(char),
  Template,
  LineComment,
  BlockComment,
}
