//! Inserts a descriptive comment above every recognized line that lacks one.
//!
//! Each line is tested against [`ANNOTATION_RULES`] in order and the first
//! match wins. A line whose previous line is already a comment is left alone.
//! All insertions are planned against one snapshot and returned as a single
//! [`Transaction`].

use thiserror::Error;
use tracing::debug;

use crate::{
  catalog::ANNOTATION_RULES,
  comment::annotation_line,
  document::Document,
  template::{
    self,
    TemplateError,
  },
  transaction::{
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error)]
pub enum AnnotateError {
  #[error(transparent)]
  Template(#[from] TemplateError),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
  #[error("comment token must not be blank")]
  BlankCommentToken,
}

pub type Result<T> = std::result::Result<T, AnnotateError>;

/// A planned annotation for the line at `line`, without line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
  pub line: usize,
  pub text: String,
}

/// Annotation text for a single trimmed line, if any rule matches.
pub fn annotation_for(trimmed: &str) -> template::Result<Option<String>> {
  for rule in &ANNOTATION_RULES {
    if let Some(rendered) = rule.evaluate(trimmed)? {
      return Ok(Some(rendered.text));
    }
  }
  Ok(None)
}

/// Fails on a blank token: its annotations would read back as code and be
/// inserted again on every run.
pub fn plan(doc: &Document, comment_token: &str) -> Result<Vec<Annotation>> {
  if comment_token.trim().is_empty() {
    return Err(AnnotateError::BlankCommentToken);
  }
  let mut planned = Vec::new();
  for line in doc.lines() {
    if doc.is_annotated(line.index, comment_token) {
      continue;
    }
    let Some(text) = annotation_for(line.trimmed())? else {
      continue;
    };
    planned.push(Annotation {
      line: line.index,
      text: annotation_line(line.indent(), comment_token, &text),
    });
  }
  Ok(planned)
}

/// One transaction inserting every missing annotation.
pub fn insert_annotations(doc: &Document, comment_token: &str) -> Result<Transaction> {
  let planned = plan(doc, comment_token)?;
  let line_ending = doc.line_ending().as_str();
  debug!(count = planned.len(), "inserting annotations");

  let changes = planned.into_iter().map(|annotation| {
    let pos = doc.line_start(annotation.line);
    let mut text = annotation.text;
    text.push_str(line_ending);
    (pos, pos, Some(text.into()))
  });
  Ok(Transaction::change(doc.text(), changes)?)
}

#[cfg(test)]
mod test {
  use super::*;

  fn annotate(text: &str) -> String {
    let doc = Document::from(text);
    let tx = insert_annotations(&doc, "//").unwrap();
    tx.apply_to(doc.text()).unwrap().to_string()
  }

  #[test]
  fn array_literal_takes_precedence() {
    assert_eq!(
      annotate("const items = [];\nitems.push(1);"),
      "// Let `items` be an initially empty list of.\nconst items = [];\nitems.push(1);"
    );
  }

  #[test]
  fn every_shape() {
    let text = "let count = 0;\n\
                if (count > 1) {\n\
                \tfor (const entry of entries) {\n\
                \t}\n\
                }\n";
    let expected = "// Let `count` be.\n\
                    let count = 0;\n\
                    // If count > 1.\n\
                    if (count > 1) {\n\
                    \t// For each `entry` of `entries`.\n\
                    \tfor (const entry of entries) {\n\
                    \t}\n\
                    }\n";
    assert_eq!(annotate(text), expected);
  }

  #[test]
  fn skips_annotated_lines() {
    let text = "// Let `items` be a list.\nconst items = [];";
    assert_eq!(annotate(text), text);
  }

  #[test]
  fn uses_buffer_line_ending() {
    assert_eq!(
      annotate("x();\r\nconst a = 1;\r\n"),
      "x();\r\n// Let `a` be.\r\nconst a = 1;\r\n"
    );
  }

  #[test]
  fn comment_token_is_configurable() {
    let doc = Document::from("# Let `a` be.\nconst a = 1;\nconst b = 2;");
    let planned = plan(&doc, "#").unwrap();
    assert_eq!(planned, vec![Annotation {
      line: 2,
      text: "# Let `b` be.".into(),
    }]);
  }

  #[test]
  fn consecutive_declarations_annotate_once_per_pass() {
    let doc = Document::from("const a = 1;\nconst b = 2;");
    let tx = insert_annotations(&doc, "//").unwrap();
    let once = tx.apply_to(doc.text()).unwrap();
    assert_eq!(
      once,
      "// Let `a` be.\nconst a = 1;\n// Let `b` be.\nconst b = 2;"
    );

    let again = Document::new(once.clone());
    assert!(insert_annotations(&again, "//").unwrap().is_empty());
  }

  #[test]
  fn blank_comment_token_is_rejected() {
    let doc = Document::from("const a = 1;");
    assert!(matches!(
      insert_annotations(&doc, ""),
      Err(AnnotateError::BlankCommentToken)
    ));
    assert!(matches!(
      insert_annotations(&doc, "  "),
      Err(AnnotateError::BlankCommentToken)
    ));
  }
}
