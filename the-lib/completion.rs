//! Completion candidates for the token before the cursor.
//!
//! Two branches:
//!
//! - inside a template literal, every known identifier starting with the typed
//!   prefix is offered as `${name}`;
//! - anywhere else, the typed prefix is matched against the labels of
//!   [`SNIPPETS`], with the word before it (the context token) bound into the
//!   snippet.
//!
//! The cancel token is checked before each candidate. A cancelled request
//! yields no candidates at all.

use the_core::chars::{
  char_is_word,
  word_start_before,
};
use tracing::{
  debug,
  warn,
};

use crate::{
  cancel::CancelToken,
  candidate::{
    Candidate,
    CandidateKind,
    InsertFormat,
  },
  catalog::{
    SNIPPETS,
    SnippetEntry,
    SnippetKind,
  },
  document::Document,
  pluralize::{
    is_plural,
    to_singular,
  },
  position::Position,
  provider::SymbolProvider,
  template::{
    self,
    Bindings,
    Placeholder,
  },
};

/// The typed prefix and the word before it, as char columns on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
  pub row:           usize,
  pub prefix_start:  usize,
  pub cursor:        usize,
  pub prefix:        String,
  pub context_start: Option<usize>,
  pub context:       Option<String>,
}

impl TokenContext {
  pub fn at(doc: &Document, at: Position) -> Option<Self> {
    let line = doc.line(at.row)?;
    let chars: Vec<char> = line.text.chars().collect();
    let cursor = at.col.min(chars.len());

    let prefix_start = word_start_before(&chars, cursor);
    let separator_start = chars[..prefix_start]
      .iter()
      .rposition(|&ch| char_is_word(ch))
      .map_or(0, |idx| idx + 1);
    let context_start = word_start_before(&chars, separator_start);

    let (context_start, context) = if context_start < separator_start {
      (
        Some(context_start),
        Some(chars[context_start..separator_start].iter().collect()),
      )
    } else {
      (None, None)
    };

    Some(Self {
      row: at.row,
      prefix_start,
      cursor,
      prefix: chars[prefix_start..cursor].iter().collect(),
      context_start,
      context,
    })
  }

  fn bindings_for(&self, label: &str, template: &str) -> Bindings {
    let mut bindings = Bindings::new();
    if let Some(word) = label.split_whitespace().next() {
      bindings.bind(Placeholder::Label, word);
    }
    if let Some(context) = self.context.as_deref() {
      bindings.bind(Placeholder::Identifier, context);
      if is_plural(context) {
        bindings.bind(Placeholder::Collection, context);
        if template.contains(Placeholder::Element.marker()) {
          bindings.bind(Placeholder::Element, to_singular(context));
        }
      }
    }
    bindings
  }
}

pub fn resolve(
  doc: &Document,
  at: Position,
  symbols: &dyn SymbolProvider,
  cancel: &CancelToken,
) -> template::Result<Vec<Candidate>> {
  let Some(tokens) = TokenContext::at(doc, at) else {
    return Ok(Vec::new());
  };

  let cursor = doc.char_idx(Position::new(tokens.row, tokens.cursor));
  let candidates = if doc.in_template_literal(cursor) {
    template_literal_candidates(doc, &tokens, symbols, cancel)
  } else {
    snippet_candidates(&tokens, cancel)?
  };

  debug!(
    row = tokens.row,
    prefix = %tokens.prefix,
    count = candidates.len(),
    "resolved completions"
  );
  Ok(candidates)
}

fn template_literal_candidates(
  doc: &Document,
  tokens: &TokenContext,
  symbols: &dyn SymbolProvider,
  cancel: &CancelToken,
) -> Vec<Candidate> {
  let names = match symbols.identifiers(doc) {
    Ok(names) => names,
    Err(err) => {
      warn!(%err, "symbol lookup failed, offering no identifiers");
      return Vec::new();
    },
  };

  let anchor = Position::new(tokens.row, tokens.prefix_start);
  let end = Position::new(tokens.row, tokens.cursor);
  let mut candidates = Vec::new();
  for name in names {
    if cancel.is_cancelled() {
      debug!("completion cancelled");
      return Vec::new();
    }
    if !name.starts_with(tokens.prefix.as_str()) {
      continue;
    }
    candidates.push(Candidate {
      label: name.to_string(),
      text: format!("${{{name}}}"),
      anchor,
      end,
      kind: CandidateKind::Variable,
      format: InsertFormat::PlainText,
      detail: None,
    });
  }
  candidates
}

fn snippet_candidates(
  tokens: &TokenContext,
  cancel: &CancelToken,
) -> template::Result<Vec<Candidate>> {
  let end = Position::new(tokens.row, tokens.cursor);
  let mut candidates = Vec::new();

  for entry in SNIPPETS {
    for label in entry.labels {
      if cancel.is_cancelled() {
        debug!("completion cancelled");
        return Ok(Vec::new());
      }
      if !label.starts_with(tokens.prefix.as_str()) {
        continue;
      }

      let bindings = tokens.bindings_for(label, entry.template);
      if !bindings.covers(entry.template) {
        continue;
      }

      let start = match tokens.context_start {
        Some(context_start) if entry.replaces_context => context_start,
        _ => tokens.prefix_start,
      };
      candidates.push(Candidate {
        label:  label.to_string(),
        text:   template::render(entry.template, &bindings)?,
        anchor: Position::new(tokens.row, start),
        end,
        kind:   candidate_kind(entry),
        format: InsertFormat::Snippet,
        detail: entry.detail.map(str::to_string),
      });
    }
  }
  Ok(candidates)
}

fn candidate_kind(entry: &SnippetEntry) -> CandidateKind {
  match entry.kind {
    SnippetKind::Method => CandidateKind::Method,
    SnippetKind::Keyword => CandidateKind::Keyword,
    SnippetKind::Snippet => CandidateKind::Snippet,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    provider::{
      CollaboratorError,
      DeclarationSymbols,
    },
    template::has_markers,
  };

  fn complete(text: &str, at: Position) -> Vec<Candidate> {
    resolve(
      &Document::from(text),
      at,
      &DeclarationSymbols,
      &CancelToken::new(),
    )
    .unwrap()
  }

  fn labels(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.label.as_str()).collect()
  }

  #[test]
  fn token_context() {
    let doc = Document::from("  items.forE");
    let tokens = TokenContext::at(&doc, Position::new(0, 12)).unwrap();
    assert_eq!(tokens.prefix, "forE");
    assert_eq!(tokens.prefix_start, 8);
    assert_eq!(tokens.context.as_deref(), Some("items"));
    assert_eq!(tokens.context_start, Some(2));

    let doc = Document::from("sort");
    let tokens = TokenContext::at(&doc, Position::new(0, 4)).unwrap();
    assert_eq!(tokens.context, None);
  }

  #[test]
  fn collection_context_binds_singular() {
    let candidates = complete("items.forEach", Position::new(0, 13));
    assert_eq!(labels(&candidates), ["forEach"]);
    let candidate = &candidates[0];
    assert_eq!(candidate.text, "items.forEach((item) => item$1);");
    assert_eq!(candidate.anchor, Position::new(0, 0));
    assert_eq!(candidate.end, Position::new(0, 13));
    assert_eq!(candidate.format, InsertFormat::Snippet);
  }

  #[test]
  fn scalar_context_skips_collection_snippets() {
    let candidates = complete("item.f", Position::new(0, 6));
    assert_eq!(labels(&candidates), ["flat"]);
    assert_eq!(candidates[0].text, "flat()$0");
    assert_eq!(candidates[0].anchor, Position::new(0, 5));
  }

  #[test]
  fn prefix_is_case_sensitive() {
    let candidates = complete("M", Position::new(0, 1));
    assert_eq!(labels(&candidates), ["Map"]);
    assert!(complete("dom", Position::new(0, 3)).is_empty());
  }

  #[test]
  fn keyword_snippets_use_label_word() {
    let candidates = complete("  co", Position::new(0, 4));
    assert_eq!(labels(&candidates), ["const"]);
    assert_eq!(candidates[0].text, "const ${1:identifier} = $2;");
    assert_eq!(candidates[0].kind, CandidateKind::Keyword);
  }

  #[test]
  fn multi_word_labels() {
    let candidates = complete("boxes.sort", Position::new(0, 10));
    assert_eq!(labels(&candidates), [
      "sort (single-line version)",
      "sort (multiple-line version)"
    ]);
    assert!(candidates[0].text.contains("boxes.sort((boxA, boxB)"));
    for candidate in &candidates {
      assert!(!has_markers(&candidate.text));
    }

    let candidates = complete("name string", Position::new(0, 11));
    assert_eq!(labels(&candidates), ["string literal"]);
    assert_eq!(candidates[0].text, "`\\${name}`");
  }

  #[test]
  fn template_literal_offers_identifiers() {
    let text = "const items = [];\nconst index = 0;\nconst label = `${in";
    let candidates = complete(text, Position::new(2, 19));
    assert_eq!(labels(&candidates), ["index"]);
    assert_eq!(candidates[0].text, "${index}");
    assert_eq!(candidates[0].anchor, Position::new(2, 17));
    assert_eq!(candidates[0].format, InsertFormat::PlainText);
  }

  #[test]
  fn cancelled_request_is_empty() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let doc = Document::from("items.");
    let candidates = resolve(&doc, Position::new(0, 6), &DeclarationSymbols, &cancel).unwrap();
    assert!(candidates.is_empty());
  }

  struct Offline;

  impl SymbolProvider for Offline {
    fn identifiers(&self, _doc: &Document) -> crate::provider::Result<Vec<crate::Tendril>> {
      Err(CollaboratorError::Unavailable {
        service: "symbols",
        reason:  "offline".into(),
      })
    }
  }

  #[test]
  fn unavailable_symbols_yield_nothing() {
    let doc = Document::from("`${a");
    let candidates = resolve(&doc, Position::new(0, 4), &Offline, &CancelToken::new()).unwrap();
    assert!(candidates.is_empty());
  }
}
