//! Change sets over a rope.
//!
//! A [`ChangeSet`] is a run of operations applied left to right from the start
//! of a document:
//!
//! - **Retain(n)** keeps `n` chars
//! - **Delete(n)** removes `n` chars
//! - **Insert(s)** inserts `s`
//!
//! Every edit the resolvers produce is a [`Transaction`] built from sorted,
//! non-overlapping `(from, to, replacement)` triples in char offsets of the
//! document it was computed against. Rename cascades compose transactions so
//! the client still receives edits against the buffer it sent.
//!
//! ```
//! use ropey::Rope;
//! use the_lib::transaction::Transaction;
//!
//! let mut doc = Rope::from("const items = [];");
//! let tx = Transaction::change(&doc, vec![(6, 11, Some("values".into()))]).unwrap();
//! tx.apply(&mut doc).unwrap();
//! assert_eq!(doc, "const values = [];");
//! ```

use ropey::{
  Rope,
  RopeBuilder,
  RopeSlice,
};
use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, TransactionError>;

/// `(from, to, replacement)` in char offsets. `None` deletes.
pub type Change = (usize, usize, Option<Tendril>);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error(
    "changeset compose length mismatch: left output {left_len_after}, right input {right_len}"
  )]
  ComposeLengthMismatch {
    left_len_after: usize,
    right_len:      usize,
  },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for changeset length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  Retain(usize),
  Delete(usize),
  Insert(Tendril),
}

impl Operation {
  pub fn len_chars(&self) -> usize {
    match self {
      Operation::Retain(n) | Operation::Delete(n) => *n,
      Operation::Insert(s) => s.chars().count(),
    }
  }
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  After,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  ops:       Vec<Operation>,
  /// Length of the document this set applies to.
  len:       usize,
  len_after: usize,
}

impl ChangeSet {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      ops:       Vec::with_capacity(capacity),
      len:       0,
      len_after: 0,
    }
  }

  #[must_use]
  pub fn new(doc: RopeSlice) -> Self {
    let len = doc.len_chars();
    Self {
      ops: Vec::new(),
      len,
      len_after: len,
    }
  }

  pub fn ops(&self) -> &[Operation] {
    &self.ops
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn len_after(&self) -> usize {
    self.len_after
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.ops.iter().all(|op| matches!(op, Operation::Retain(_)))
  }

  pub fn retain(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    self.len_after += n;
    match self.ops.last_mut() {
      Some(Operation::Retain(count)) => *count += n,
      _ => self.ops.push(Operation::Retain(n)),
    }
  }

  pub fn delete(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    match self.ops.last_mut() {
      Some(Operation::Delete(count)) => *count += n,
      _ => self.ops.push(Operation::Delete(n)),
    }
  }

  /// Appends an insertion. Inserts are kept in front of an adjacent delete so
  /// a replacement always reads `Insert, Delete`.
  pub fn insert(&mut self, fragment: Tendril) {
    use Operation::*;

    if fragment.is_empty() {
      return;
    }
    self.len_after += fragment.chars().count();

    match self.ops.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => prev.push_str(&fragment),
      [.., last @ Delete(_)] => {
        let delete = std::mem::replace(last, Insert(fragment));
        self.ops.push(delete);
      },
      _ => self.ops.push(Insert(fragment)),
    }
  }

  /// Combines `self` with `other`, which must apply to the output of `self`.
  pub fn compose(self, other: Self) -> Result<Self> {
    use Operation::*;

    if self.len_after != other.len {
      return Err(TransactionError::ComposeLengthMismatch {
        left_len_after: self.len_after,
        right_len:      other.len,
      });
    }

    // An empty set is an implicit retain over the whole document.
    if self.ops.is_empty() {
      return Ok(other);
    }
    if other.ops.is_empty() {
      return Ok(self);
    }

    let mut out = Self::with_capacity(self.ops.len() + other.ops.len());
    let mut left = self.ops.into_iter();
    let mut right = other.ops.into_iter();
    let mut head_a = left.next();
    let mut head_b = right.next();

    loop {
      match (head_a.take(), head_b.take()) {
        (None, None) => break,
        (Some(Delete(n)), b) => {
          out.delete(n);
          head_a = left.next();
          head_b = b;
        },
        (a, Some(Insert(s))) => {
          out.insert(s);
          head_a = a;
          head_b = right.next();
        },
        (Some(Retain(i)), Some(Retain(j))) => {
          let n = i.min(j);
          out.retain(n);
          head_a = rest_or_next(Retain, i - n, &mut left);
          head_b = rest_or_next(Retain, j - n, &mut right);
        },
        (Some(Retain(i)), Some(Delete(j))) => {
          let n = i.min(j);
          out.delete(n);
          head_a = rest_or_next(Retain, i - n, &mut left);
          head_b = rest_or_next(Delete, j - n, &mut right);
        },
        (Some(Insert(s)), Some(Retain(j))) => {
          let (kept, rest) = split_chars(s, j);
          let n = kept.chars().count();
          out.insert(kept);
          head_a = rest.map(Insert).or_else(|| left.next());
          head_b = rest_or_next(Retain, j - n, &mut right);
        },
        (Some(Insert(s)), Some(Delete(j))) => {
          let (dropped, rest) = split_chars(s, j);
          let n = dropped.chars().count();
          head_a = rest.map(Insert).or_else(|| left.next());
          head_b = rest_or_next(Delete, j - n, &mut right);
        },
        // Unreachable for sets whose lengths agree, which was checked above.
        (Some(_), None) | (None, Some(_)) => {
          return Err(TransactionError::ComposeLengthMismatch {
            left_len_after: out.len_after,
            right_len:      out.len,
          });
        },
      }
    }

    Ok(out)
  }

  fn ensure_len(&self, text_len: usize) -> Result<()> {
    if text_len != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   text_len,
      });
    }
    Ok(())
  }

  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    self.ensure_len(text.len_chars())?;
    let mut pos = 0;
    for op in &self.ops {
      match op {
        Operation::Retain(n) => pos += n,
        Operation::Delete(n) => text.remove(pos..pos + *n),
        Operation::Insert(s) => {
          text.insert(pos, s);
          pos += s.chars().count();
        },
      }
    }
    Ok(())
  }

  /// Applies to a copy, leaving `text` untouched.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;
    for op in &self.ops {
      match op {
        Operation::Retain(n) => {
          for chunk in text.slice(pos..pos + *n).chunks() {
            builder.append(chunk);
          }
          pos += n;
        },
        Operation::Delete(n) => pos += n,
        Operation::Insert(s) => builder.append(s),
      }
    }
    for chunk in text.slice(pos..).chunks() {
      builder.append(chunk);
    }
    Ok(builder.finish())
  }

  /// Maps a char offset in the old document to the new one.
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    use Operation::*;

    let mut old = 0;
    let mut new = 0;
    let mut ops = self.ops.iter().peekable();

    while let Some(op) = ops.next() {
      match op {
        Retain(n) => {
          if pos < old + n {
            return Ok(new + (pos - old));
          }
          old += n;
          new += n;
        },
        Delete(n) => {
          if pos < old + n {
            return Ok(new);
          }
          old += n;
        },
        Insert(s) => {
          let inserted = s.chars().count();
          let replaced = match ops.peek() {
            Some(Delete(n)) => {
              let n = *n;
              ops.next();
              n
            },
            _ => 0,
          };
          if pos == old || pos < old + replaced {
            return Ok(match assoc {
              Assoc::Before => new,
              Assoc::After => new + inserted,
            });
          }
          old += replaced;
          new += inserted;
        },
      }
    }

    // Trailing text not covered by any operation is retained.
    if pos >= old && pos <= self.len {
      Ok(new + (pos - old))
    } else {
      Err(TransactionError::PositionOutOfBounds { pos, len: self.len })
    }
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    ChangeIterator {
      ops: self.ops.iter().peekable(),
      pos: 0,
    }
  }
}

fn rest_or_next(
  op: fn(usize) -> Operation,
  rest: usize,
  iter: &mut impl Iterator<Item = Operation>,
) -> Option<Operation> {
  if rest > 0 { Some(op(rest)) } else { iter.next() }
}

/// Splits `s` after `n` chars. The second half is `None` when empty.
fn split_chars(mut s: Tendril, n: usize) -> (Tendril, Option<Tendril>) {
  let Some((idx, _)) = s.char_indices().nth(n) else {
    return (s, None);
  };
  let tail = s.split_off(idx);
  (s, Some(tail))
}

/// Yields the set's edits as [`Change`]s in old-document offsets.
pub struct ChangeIterator<'a> {
  ops: std::iter::Peekable<std::slice::Iter<'a, Operation>>,
  pos: usize,
}

impl Iterator for ChangeIterator<'_> {
  type Item = Change;

  fn next(&mut self) -> Option<Self::Item> {
    use Operation::*;

    loop {
      match self.ops.next()? {
        Retain(n) => self.pos += n,
        Delete(n) => {
          let start = self.pos;
          self.pos += n;
          return Some((start, self.pos, None));
        },
        Insert(s) => {
          let start = self.pos;
          if let Some(Delete(n)) = self.ops.peek() {
            self.pos += n;
            self.ops.next();
          }
          return Some((start, self.pos, Some(s.clone())));
        },
      }
    }
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes: ChangeSet,
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self { changes }
  }
}

impl Transaction {
  /// An empty transaction over `doc`.
  pub fn new(doc: &Rope) -> Self {
    Self {
      changes: ChangeSet::new(doc.slice(..)),
    }
  }

  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  pub fn is_empty(&self) -> bool {
    self.changes.is_empty()
  }

  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  pub fn compose(self, other: Self) -> Result<Self> {
    Ok(Self {
      changes: self.changes.compose(other.changes)?,
    })
  }

  /// Builds a transaction from changes in any order. Changes are sorted by
  /// start; overlapping ranges are an error.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let mut changes: Vec<Change> = changes.into_iter().collect();
    changes.sort_by_key(|(from, to, _)| (*from, *to));

    let mut changeset = ChangeSet::with_capacity(2 * changes.len() + 1);
    let mut last = 0;
    for (from, to, text) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }
      changeset.retain(from - last);
      if let Some(text) = text {
        changeset.insert(text);
      }
      changeset.delete(to - from);
      last = to;
    }
    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Inserts `text` at `pos`.
  pub fn insert(doc: &Rope, pos: usize, text: impl Into<Tendril>) -> Result<Self> {
    Self::change(doc, [(pos, pos, Some(text.into()))])
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    self.changes.changes_iter()
  }
}
