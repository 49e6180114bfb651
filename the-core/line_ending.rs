//! Line endings as the language server protocol counts them: `\n`, `\r\n`
//! and a lone `\r`. The workspace builds ropey with `cr_lines` only, so rope
//! line indices agree with client line numbers.

use ropey::{
  Rope,
  RopeSlice,
};

#[cfg(target_os = "windows")]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::Crlf;

#[cfg(not(target_os = "windows"))]
pub const NATIVE_LINE_ENDING: LineEnding = LineEnding::LF;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,

  /// U+000D -- CarriageReturn
  CR,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      _ => 1,
    }
  }

  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Crlf => "\u{000D}\u{000A}",
      Self::LF => "\u{000A}",
      Self::CR => "\u{000D}",
    }
  }

  #[inline]
  pub const fn from_char(ch: char) -> Option<LineEnding> {
    match ch {
      '\u{000A}' => Some(LineEnding::LF),
      '\u{000D}' => Some(LineEnding::CR),
      _ => None,
    }
  }

  #[allow(clippy::should_implement_trait)]
  #[inline]
  pub fn from_str(g: &str) -> Option<LineEnding> {
    match g {
      "\u{000D}\u{000A}" => Some(LineEnding::Crlf),
      "\u{000A}" => Some(LineEnding::LF),
      "\u{000D}" => Some(LineEnding::CR),
      _ => None,
    }
  }
}

/// Attempts to detect what line ending the passed document uses.
pub fn auto_detect_line_ending(doc: &Rope) -> Option<LineEnding> {
  doc.lines().take(100).find_map(|line| get_line_ending(&line))
}

/// Returns the passed line's line ending, if any.
pub fn get_line_ending(line: &RopeSlice) -> Option<LineEnding> {
  let len = line.len_chars();
  let last = line.get_char(len.checked_sub(1)?)?;
  match last {
    '\u{000A}' if len >= 2 && line.char(len - 2) == '\u{000D}' => Some(LineEnding::Crlf),
    ch => LineEnding::from_char(ch),
  }
}

/// Returns the char index of the end of the given line, not including its line
/// ending.
pub fn line_end_char_index(slice: &RopeSlice, line: usize) -> usize {
  slice.line_to_char(line + 1)
    - get_line_ending(&slice.line(line))
      .map(|le| le.len_chars())
      .unwrap_or(0)
}

/// Get line `line_idx` from the passed rope slice, sans any line ending.
pub fn line_without_line_ending<'a>(slice: &'a RopeSlice, line_idx: usize) -> RopeSlice<'a> {
  let start = slice.line_to_char(line_idx);
  let end = line_end_char_index(slice, line_idx);
  slice.slice(start..end)
}

#[cfg(test)]
mod line_ending_tests {
  use super::*;

  #[test]
  fn line_ending_autodetect() {
    assert_eq!(
      auto_detect_line_ending(&Rope::from_str("\n")),
      Some(LineEnding::LF)
    );
    assert_eq!(
      auto_detect_line_ending(&Rope::from_str("const a = 1;\r\nlet b = 2;\r\n")),
      Some(LineEnding::Crlf)
    );
    assert_eq!(auto_detect_line_ending(&Rope::from_str("no ending")), None);
    assert_eq!(auto_detect_line_ending(&Rope::from_str("")), None);
  }

  #[test]
  fn strips_line_endings() {
    let text = Rope::from_str("one\r\ntwo\nthree");
    let slice = text.slice(..);
    assert_eq!(line_without_line_ending(&slice, 0), "one");
    assert_eq!(line_without_line_ending(&slice, 1), "two");
    assert_eq!(line_without_line_ending(&slice, 2), "three");
    assert_eq!(line_end_char_index(&slice, 0), 3);
    assert_eq!(line_end_char_index(&slice, 1), 8);
  }
}
