use ropey::RopeSlice;
use the_core::line_ending::line_end_char_index;

/// A point in a buffer. Zero-based row, column counted in chars.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
  pub row: usize,
  pub col: usize,
}

impl Position {
  pub const fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }

  pub const fn zero() -> Self {
    Self { row: 0, col: 0 }
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}

/// Converts a char index into a [`Position`]. Indices past the end clamp to
/// the end of the buffer.
pub fn coords_at_pos(text: RopeSlice, pos: usize) -> Position {
  let pos = pos.min(text.len_chars());
  let row = text.char_to_line(pos);
  Position::new(row, pos - text.line_to_char(row))
}

/// Converts a [`Position`] into a char index.
///
/// Rows past the last line use the last line. Columns past the end of a line
/// land before its line ending.
pub fn char_idx_at_coords(text: RopeSlice, coords: Position) -> usize {
  let row = coords.row.min(text.len_lines().saturating_sub(1));
  let line_start = text.line_to_char(row);
  let line_end = line_end_char_index(&text, row);
  (line_start + coords.col).min(line_end)
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  #[test]
  fn round_trip_within_lines() {
    let text = Rope::from("const a = 1;\r\nlet bé = 2;\nif (a) {");
    let slice = text.slice(..);
    for pos in 0..text.len_chars() {
      let coords = coords_at_pos(slice, pos);
      let line_end = line_end_char_index(&slice, coords.row);
      if pos <= line_end {
        assert_eq!(char_idx_at_coords(slice, coords), pos);
      }
    }
  }

  #[test]
  fn clamps_out_of_range() {
    let text = Rope::from("ab\ncd");
    let slice = text.slice(..);
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 10)), 2);
    assert_eq!(char_idx_at_coords(slice, Position::new(9, 1)), 4);
    assert_eq!(coords_at_pos(slice, 99), Position::new(1, 2));
  }

  #[test]
  fn cr_counts_as_line_break() {
    let text = Rope::from("a\rb");
    assert_eq!(coords_at_pos(text.slice(..), 2), Position::new(1, 0));
  }
}
