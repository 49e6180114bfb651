//! Rename with annotation synchronization and loop-variable cascades.
//!
//! Each step renames one identifier in a working copy of the buffer: its
//! textual occurrences plus the annotation rewrites the synchronizer finds.
//! The synchronizer's cascade requests are queued and run as further steps
//! against the updated copy, up to `max-depth` levels. Every step's
//! transaction is composed onto the previous ones, so the result is a single
//! transaction against the original snapshot.

use std::collections::VecDeque;

use the_core::chars::char_is_word;
use the_lib::{
  Tendril,
  document::{
    Document,
    DocumentError,
  },
  position::Position,
  provider::{
    RenameRequest,
    ReferenceProvider,
    TextualReferences,
    identifier_at,
    occurrences,
  },
  sync::{
    SyncError,
    synchronize,
  },
  transaction::{
    Assoc,
    Change,
    Transaction,
    TransactionError,
  },
};
use thiserror::Error;
use tracing::{
  debug,
  warn,
};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum RenameError {
  #[error("no identifier at {}:{}", .0.row, .0.col)]
  NoIdentifier(Position),
  #[error("`{0}` is not a valid identifier")]
  InvalidName(String),
  #[error(transparent)]
  Sync(#[from] SyncError),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
  #[error(transparent)]
  Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, RenameError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
  /// All edits, against the snapshot the rename started from.
  pub transaction: Transaction,
  pub rewrites:    usize,
  pub cascades:    usize,
}

pub fn is_valid_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  chars
    .next()
    .is_some_and(|first| char_is_word(first) && !first.is_ascii_digit())
    && chars.all(char_is_word)
}

/// Renames the identifier at `at` to `new_name`.
pub fn rename(
  doc: &Document,
  at: Position,
  new_name: &str,
  config: &ServerConfig,
) -> Result<RenameOutcome> {
  if !is_valid_identifier(new_name) {
    return Err(RenameError::InvalidName(new_name.to_string()));
  }
  let mut cascade = Cascade::new(doc, config);
  cascade.rename_at(at, new_name, 0)?;
  cascade.run()
}

/// Rewrites the annotations above references of `old` and runs the
/// cascades, without renaming `old` itself.
pub fn sync_annotations(
  doc: &Document,
  old: &str,
  new: &str,
  config: &ServerConfig,
) -> Result<RenameOutcome> {
  let token = config.comment_token.as_str();
  let references = occurrences(doc, old, token);

  let mut requests: Vec<RenameRequest> = Vec::new();
  let report = synchronize(doc, old, new, &references, token, &mut requests)?;

  let mut cascade = Cascade::new(doc, config);
  cascade.rewrites += report.rewrites.len();
  cascade.commit(report.changes(doc), requests, 0)?;
  cascade.run()
}

struct Cascade<'a> {
  config:   &'a ServerConfig,
  work:     Document,
  composed: Transaction,
  /// Pending renames as char offsets into `work`.
  queue:    VecDeque<(usize, Tendril, usize)>,
  rewrites: usize,
  cascades: usize,
}

impl<'a> Cascade<'a> {
  fn new(doc: &Document, config: &'a ServerConfig) -> Self {
    Self {
      config,
      work: doc.clone(),
      composed: Transaction::new(doc.text()),
      queue: VecDeque::new(),
      rewrites: 0,
      cascades: 0,
    }
  }

  fn rename_at(&mut self, at: Position, new_name: &str, depth: usize) -> Result<()> {
    let old = identifier_at(&self.work, at).ok_or(RenameError::NoIdentifier(at))?;
    if old == new_name {
      return Ok(());
    }

    let token = self.config.comment_token.as_str();
    let references = TextualReferences::new(token)
      .references(&self.work, at)
      .unwrap_or_else(|err| {
        warn!(%err, "reference lookup failed");
        Vec::new()
      });

    let old_len = old.chars().count();
    let mut changes: Vec<Change> = references
      .iter()
      .map(|&reference| {
        let from = self.work.char_idx(reference);
        (from, from + old_len, Some(Tendril::from(new_name)))
      })
      .collect();

    let mut requests: Vec<RenameRequest> = Vec::new();
    if self.config.features.rename_sync {
      let report = synchronize(&self.work, &old, new_name, &references, token, &mut requests)?;
      self.rewrites += report.rewrites.len();
      changes.extend(report.changes(&self.work));
    }

    debug!(
      old = %old,
      new = new_name,
      references = references.len(),
      depth,
      "rename step"
    );
    self.commit(changes, requests, depth)
  }

  /// Applies one step to the working copy. Queued renames, old and new, are
  /// mapped through the step so they keep pointing at their identifiers.
  fn commit(
    &mut self,
    changes: Vec<Change>,
    requests: Vec<RenameRequest>,
    depth: usize,
  ) -> Result<()> {
    let transaction = Transaction::change(self.work.text(), changes)?;

    if self.config.rename.cascade && depth < self.config.rename.max_depth {
      for request in requests {
        let idx = self.work.char_idx(request.at);
        self.queue.push_back((idx, request.new_name, depth + 1));
      }
    }
    for (idx, _, _) in self.queue.iter_mut() {
      *idx = transaction.changes().map_pos(*idx, Assoc::Before)?;
    }

    self.work.apply(&transaction)?;
    let composed = std::mem::take(&mut self.composed);
    self.composed = composed.compose(transaction)?;
    Ok(())
  }

  fn run(mut self) -> Result<RenameOutcome> {
    while let Some((idx, new_name, depth)) = self.queue.pop_front() {
      let at = self.work.position(idx);
      match self.rename_at(at, &new_name, depth) {
        Ok(()) => self.cascades += 1,
        Err(err) => warn!(%err, depth, "cascaded rename failed, skipping"),
      }
    }
    Ok(RenameOutcome {
      transaction: self.composed,
      rewrites:    self.rewrites,
      cascades:    self.cascades,
    })
  }
}
