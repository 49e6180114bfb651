//! Keeps annotations in step with a renamed identifier.
//!
//! For every reference line whose previous line is a comment, each
//! backtick-quoted `` `old` `` in that comment becomes `` `new` ``. A comment
//! line is rewritten at most once, however many references sit below it.
//!
//! Renaming a collection also renames the loop variables iterating it: when
//! `old` ends in `s`, every reference line shaped `for (const x of old)`
//! produces a request to rename `x` to the singular of `new`. Those requests
//! go to a [`RenameExecutor`], one call each.

use thiserror::Error;
use tracing::{
  debug,
  warn,
};

use crate::{
  catalog::Trigger,
  comment::is_line_comment,
  document::Document,
  pluralize::{
    is_plural,
    to_singular,
  },
  position::Position,
  provider::{
    ReferenceProvider,
    RenameExecutor,
  },
  transaction::{
    Change,
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRewrite {
  pub line:   usize,
  pub before: String,
  pub after:  String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
  /// Every comment rewrite, as one batch against the input snapshot.
  pub transaction: Transaction,
  pub rewrites:    Vec<LineRewrite>,
  /// Number of loop-variable renames handed to the executor.
  pub cascades:    usize,
}

impl SyncReport {
  /// The rewrites as changes, for merging into a larger batch.
  pub fn changes(&self, doc: &Document) -> Vec<Change> {
    self
      .rewrites
      .iter()
      .map(|rewrite| rewrite.to_change(doc))
      .collect()
  }
}

impl LineRewrite {
  fn to_change(&self, doc: &Document) -> Change {
    (
      doc.line_start(self.line),
      doc.line_end(self.line),
      Some(self.after.as_str().into()),
    )
  }
}

/// Replaces every `` `old` `` in `line` with `` `new` ``. `None` when nothing
/// changed.
pub fn rewrite_comment(line: &str, old: &str, new: &str) -> Option<String> {
  let quoted_old = format!("`{old}`");
  if old.is_empty() || !line.contains(&quoted_old) {
    return None;
  }
  Some(line.replace(&quoted_old, &format!("`{new}`")))
}

pub fn synchronize(
  doc: &Document,
  old: &str,
  new: &str,
  references: &[Position],
  comment_token: &str,
  executor: &mut dyn RenameExecutor,
) -> Result<SyncReport> {
  let mut rows: Vec<usize> = references.iter().map(|pos| pos.row).collect();
  rows.sort_unstable();
  rows.dedup();

  let mut rewrites: Vec<LineRewrite> = Vec::new();
  for &row in &rows {
    let Some(comment) = doc.previous_line(row) else {
      continue;
    };
    if !is_line_comment(&comment.text, comment_token)
      || rewrites.iter().any(|rewrite| rewrite.line == comment.index)
    {
      continue;
    }
    if let Some(after) = rewrite_comment(&comment.text, old, new) {
      rewrites.push(LineRewrite {
        line: comment.index,
        before: comment.text,
        after,
      });
    }
  }

  let mut cascades = 0;
  if is_plural(old) {
    let singular = to_singular(new);
    for &row in &rows {
      let Some(at) = loop_variable_over(doc, row, old) else {
        continue;
      };
      match executor.rename(doc, at, &singular) {
        Ok(()) => cascades += 1,
        Err(err) => warn!(%err, row, "cascaded rename failed, skipping"),
      }
    }
  }

  let transaction = Transaction::change(
    doc.text(),
    rewrites.iter().map(|rewrite| rewrite.to_change(doc)),
  )?;
  debug!(
    old,
    new,
    rewrites = rewrites.len(),
    cascades,
    "synchronized annotations"
  );
  Ok(SyncReport {
    transaction,
    rewrites,
    cascades,
  })
}

/// Looks the references up through `provider`, then synchronizes. A failing
/// provider leaves the buffer untouched.
pub fn synchronize_at(
  doc: &Document,
  at: Position,
  new: &str,
  provider: &dyn ReferenceProvider,
  comment_token: &str,
  executor: &mut dyn RenameExecutor,
) -> Result<SyncReport> {
  let old = crate::provider::identifier_at(doc, at).unwrap_or_default();
  let references = match provider.references(doc, at) {
    Ok(references) => references,
    Err(err) => {
      warn!(%err, "reference lookup failed, nothing to synchronize");
      Vec::new()
    },
  };
  synchronize(doc, &old, new, &references, comment_token, executor)
}

/// Position of `x` when line `row` reads `for (const x of collection)`.
fn loop_variable_over(doc: &Document, row: usize, collection: &str) -> Option<Position> {
  let line = doc.line(row)?;
  let captures = Trigger::ForOf.captures(line.trimmed())?;
  if captures.text(1)? != collection {
    return None;
  }
  let variable = captures.get(0)?;
  Some(Position::new(row, line.indent_width() + variable.column))
}
