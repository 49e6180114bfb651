//! Static catalog of recognized line shapes and the text offered for them.
//!
//! Every rule is plain data: a [`Trigger`] that matches one trimmed line, a
//! template, and a [`Binding`] saying how the trigger's captures map onto
//! template placeholders. The resolvers in [`crate::refactor`],
//! [`crate::annotate`] and [`crate::completion`] interpret these tables; no
//! rule carries behaviour of its own.
//!
//! Triggers only ever see a single line with surrounding whitespace removed.

use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;

use crate::{
  Tendril,
  pluralize::{
    is_plural,
    to_singular,
  },
  template::{
    self,
    Bindings,
    Placeholder,
  },
};

static DECLARATION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(?:const|let)\s(\w+)\s=").expect("valid declaration regex"));

static ARRAY_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:const|let)\s(\w+)\s=\s\[\]").expect("valid array literal regex")
});

static CONST_DECLARATION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^const\s(\w+)\s=").expect("valid const regex"));

static FOR_OF: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^for\s\(const\s(\w+)\sof\s(\w+)\)").expect("valid for-of regex")
});

const CONDITIONAL_PREFIX: &str = "if (";

/// A line-local shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
  /// `const items = []`, identifier ending in `s`.
  ArrayLiteral,
  /// Any `const` or `let` binding.
  Declaration,
  /// `const` binding of an identifier ending in `s`.
  Collection,
  /// A declaration that is not a [`Trigger::Collection`].
  Scalar,
  /// A line starting with `if (`.
  Conditional,
  /// `for (const item of items)`. Captures the variable, then the iterable.
  ForOf,
}

/// One captured substring and the char column where it starts in the trimmed
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
  pub text:   Tendril,
  pub column: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(SmallVec<[Capture; 2]>);

impl Captures {
  pub fn get(&self, idx: usize) -> Option<&Capture> {
    self.0.get(idx)
  }

  pub fn text(&self, idx: usize) -> Option<&str> {
    self.get(idx).map(|capture| capture.text.as_str())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  fn from_regex(trimmed: &str, caps: regex::Captures<'_>) -> Self {
    let captures = caps
      .iter()
      .skip(1)
      .flatten()
      .map(|m| {
        Capture {
          text:   m.as_str().into(),
          column: trimmed[..m.start()].chars().count(),
        }
      })
      .collect();
    Self(captures)
  }
}

impl Trigger {
  /// Matches `trimmed` and returns its captures, or `None` for no match.
  pub fn captures(self, trimmed: &str) -> Option<Captures> {
    match self {
      Trigger::ArrayLiteral => {
        let caps = ARRAY_LITERAL.captures(trimmed)?;
        is_plural(&caps[1]).then(|| Captures::from_regex(trimmed, caps))
      },
      Trigger::Declaration => {
        let caps = DECLARATION.captures(trimmed)?;
        Some(Captures::from_regex(trimmed, caps))
      },
      Trigger::Collection => {
        let caps = CONST_DECLARATION.captures(trimmed)?;
        is_plural(&caps[1]).then(|| Captures::from_regex(trimmed, caps))
      },
      Trigger::Scalar => {
        if Trigger::Collection.matches(trimmed) {
          return None;
        }
        Trigger::Declaration.captures(trimmed)
      },
      Trigger::Conditional => conditional_captures(trimmed),
      Trigger::ForOf => {
        let caps = FOR_OF.captures(trimmed)?;
        Some(Captures::from_regex(trimmed, caps))
      },
    }
  }

  pub fn matches(self, trimmed: &str) -> bool {
    self.captures(trimmed).is_some()
  }
}

/// Captures the condition of `if (...)` by paren matching, so calls inside the
/// condition survive. An unclosed condition captures the rest of the line.
fn conditional_captures(trimmed: &str) -> Option<Captures> {
  let rest = trimmed.strip_prefix(CONDITIONAL_PREFIX)?;
  let mut depth = 0usize;
  let mut end = rest.len();
  for (idx, ch) in rest.char_indices() {
    match ch {
      '(' => depth += 1,
      ')' if depth == 0 => {
        end = idx;
        break;
      },
      ')' => depth -= 1,
      _ => {},
    }
  }

  let condition = rest[..end].trim_end();
  let column = CONDITIONAL_PREFIX.chars().count();
  Some(Captures(SmallVec::from_iter([Capture {
    text: condition.into(),
    column,
  }])))
}

/// How captures are bound to placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
  /// Capture 0 is the identifier.
  Identifier,
  /// Capture 0 is a collection; its singular is derived on demand.
  Collection,
  /// Capture 0 is the loop variable, capture 1 the iterable.
  Loop,
  /// Capture 0 is a condition expression.
  Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRule {
  pub name:     &'static str,
  pub trigger:  Trigger,
  /// Title template shown to the user.
  pub title:    &'static str,
  pub template: &'static str,
  pub binding:  Binding,
}

/// A rule rendered against one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRule {
  pub rule:     &'static PatternRule,
  pub title:    String,
  pub text:     String,
  pub captures: Captures,
}

impl PatternRule {
  /// Whether the title or body uses `placeholder`.
  pub fn uses(&self, placeholder: Placeholder) -> bool {
    let marker = placeholder.marker();
    self.title.contains(marker) || self.template.contains(marker)
  }

  pub fn bindings(&self, captures: &Captures) -> Bindings {
    let mut bindings = Bindings::new();
    let Some(primary) = captures.text(0) else {
      return bindings;
    };

    match self.binding {
      Binding::Identifier => {
        bindings.bind(Placeholder::Identifier, primary);
      },
      Binding::Collection => {
        bindings
          .bind(Placeholder::Identifier, primary)
          .bind(Placeholder::Collection, primary);
        if self.uses(Placeholder::Element) {
          bindings.bind(Placeholder::Element, to_singular(primary));
        }
      },
      Binding::Loop => {
        bindings
          .bind(Placeholder::Identifier, primary)
          .bind(Placeholder::Element, primary);
        if let Some(iterable) = captures.text(1) {
          bindings.bind(Placeholder::Collection, iterable);
        }
      },
      Binding::Condition => {
        bindings.bind(Placeholder::Condition, primary);
      },
    }
    bindings
  }

  /// Runs the trigger on `trimmed` and renders title and body on a match.
  pub fn evaluate(&'static self, trimmed: &str) -> template::Result<Option<RenderedRule>> {
    let Some(captures) = self.trigger.captures(trimmed) else {
      return Ok(None);
    };
    let bindings = self.bindings(&captures);
    Ok(Some(RenderedRule {
      rule: self,
      title: template::render(self.title, &bindings)?,
      text: template::render(self.template, &bindings)?,
      captures,
    }))
  }
}

/// Refactor actions offered for the line under the cursor. Every matching rule
/// produces a candidate.
pub static REFACTOR_RULES: [PatternRule; 5] = [
  PatternRule {
    name:     "for-of",
    trigger:  Trigger::Collection,
    title:    "Iterate over `^collection^`",
    template: "// For each `^element^` of `^collection^`.\n\
               for (const ^element^ of ^collection^) {\n\t\n}",
    binding:  Binding::Collection,
  },
  PatternRule {
    name:     "push",
    trigger:  Trigger::Collection,
    title:    "Add a new `^element^` to `^collection^`",
    template: "const ^element^ = null;\n^collection^.push(^element^);",
    binding:  Binding::Collection,
  },
  PatternRule {
    name:     "if-guard",
    trigger:  Trigger::Collection,
    title:    "Guard on `^identifier^`",
    template: "if (^identifier^) {\n\t\n}",
    binding:  Binding::Collection,
  },
  PatternRule {
    name:     "keyed-sort",
    trigger:  Trigger::Collection,
    title:    "Sort `^collection^` by a precomputed key",
    template: "const ^element^Keys = new Map(^collection^.map((^element^) => [^element^, 0]));\n\
               ^collection^.sort((^element^A, ^element^B) => ^element^Keys.get(^element^A) - \
               ^element^Keys.get(^element^B));",
    binding:  Binding::Collection,
  },
  PatternRule {
    name:     "if-guard",
    trigger:  Trigger::Scalar,
    title:    "Guard on `^identifier^`",
    template: "if (^identifier^) {\n\t\n}",
    binding:  Binding::Identifier,
  },
];

/// Annotation text per shape, in precedence order. The first matching rule
/// wins. Templates carry no comment token; the inserter adds it.
pub static ANNOTATION_RULES: [PatternRule; 4] = [
  PatternRule {
    name:     "array-literal",
    trigger:  Trigger::ArrayLiteral,
    title:    "Annotate `^identifier^`",
    template: "Let `^identifier^` be an initially empty list of.",
    binding:  Binding::Identifier,
  },
  PatternRule {
    name:     "declaration",
    trigger:  Trigger::Declaration,
    title:    "Annotate `^identifier^`",
    template: "Let `^identifier^` be.",
    binding:  Binding::Identifier,
  },
  PatternRule {
    name:     "conditional",
    trigger:  Trigger::Conditional,
    title:    "Annotate condition",
    template: "If ^condition^.",
    binding:  Binding::Condition,
  },
  PatternRule {
    name:     "for-of",
    trigger:  Trigger::ForOf,
    title:    "Annotate loop over `^collection^`",
    template: "For each `^element^` of `^collection^`.",
    binding:  Binding::Loop,
  },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
  Method,
  Keyword,
  Snippet,
}

/// A completion table entry. Each label is offered separately; `^label^`
/// binds to the first word of the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetEntry {
  pub labels:           &'static [&'static str],
  pub template:         &'static str,
  pub kind:             SnippetKind,
  /// The snippet rewrites the context token, so the replaced span starts at
  /// the context token instead of the typed prefix.
  pub replaces_context: bool,
  pub detail:           Option<&'static str>,
}

/// Completion snippets in display order. Templates use editor snippet syntax
/// (`$1`, `${1:name}`, `$0`) on top of the placeholder markers.
pub static SNIPPETS: &[SnippetEntry] = &[
  SnippetEntry {
    labels:           &["addEventListener"],
    template:         "addEventListener('${1:type}', (event) => {\n\t$0\n});",
    kind:             SnippetKind::Method,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["lookahead positive assertion"],
    template:         "(?=$1)",
    kind:             SnippetKind::Snippet,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["lookahead negative assertion"],
    template:         "(?!$1)",
    kind:             SnippetKind::Snippet,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["lookbehind positive assertion"],
    template:         "(?<=$1)",
    kind:             SnippetKind::Snippet,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["lookbehind negative assertion"],
    template:         "(?<!$1)",
    kind:             SnippetKind::Snippet,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["every", "filter", "find", "findIndex", "forEach", "map", "some"],
    template:         "^collection^.^label^((^element^) => ^element^$1);",
    kind:             SnippetKind::Method,
    replaces_context: true,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["flat", "Map", "reverse", "Set", "shift", "unshift"],
    template:         "^label^()$0",
    kind:             SnippetKind::Method,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["case"],
    template:         "case $1:\n\t$2;\n\tbreak;",
    kind:             SnippetKind::Keyword,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["const", "let"],
    template:         "^label^ ${1:identifier} = $2;",
    kind:             SnippetKind::Keyword,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["destructuring"],
    template:         "// Let `${1:identifier}` be $2.\nconst { ${1:identifier} } = ^identifier^;",
    kind:             SnippetKind::Snippet,
    replaces_context: true,
    detail:           Some("Destructures a property out of the preceding identifier"),
  },
  SnippetEntry {
    labels:           &["DOMParser"],
    template:         "const template = [].join('');\n\
                       const parser = new DOMParser();\n\
                       const children = [...parser.parseFromString(template, \
                       'text/html').querySelector('${1:selector}')];\n\
                       const parentElement = $0;\n\
                       parentElement.append(...children);",
    kind:             SnippetKind::Snippet,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["push"],
    template:         "// Add `^element^` to `^collection^`.\n^collection^.push(^element^);",
    kind:             SnippetKind::Method,
    replaces_context: true,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["sort (single-line version)"],
    template:         "// Sort `^collection^`.\n\
                       ^collection^.sort((^element^A, ^element^B) => ^element^A$1 - ^element^B$2);",
    kind:             SnippetKind::Method,
    replaces_context: true,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["sort (multiple-line version)"],
    template:         "// Sort `^collection^`.\n\
                       ^collection^.sort((^element^A, ^element^B) => {\n\
                       \tlet comparison = 0;\n\
                       \n\
                       \tif (^element^A$1 < ^element^B$2) {\n\
                       \t\tcomparison = 1;\n\
                       \t}\n\
                       \telse if (^element^A$1 > ^element^B$2) {\n\
                       \t\tcomparison = -1;\n\
                       \t}\n\
                       \n\
                       \treturn comparison;\n\
                       });",
    kind:             SnippetKind::Method,
    replaces_context: true,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["querySelector", "querySelectorAll"],
    template:         "^label^('${1:selector}')",
    kind:             SnippetKind::Method,
    replaces_context: false,
    detail:           None,
  },
  SnippetEntry {
    labels:           &["string literal"],
    template:         "`\\${^identifier^}`",
    kind:             SnippetKind::Snippet,
    replaces_context: true,
    detail:           Some("Formats identifier into a string literal"),
  },
];

#[cfg(test)]
mod test {
  use super::*;

  fn texts(captures: &Captures) -> Vec<&str> {
    (0..captures.len()).filter_map(|idx| captures.text(idx)).collect()
  }

  #[test]
  fn array_literal_shape() {
    let caps = Trigger::ArrayLiteral.captures("const items = [];").unwrap();
    assert_eq!(texts(&caps), ["items"]);
    assert_eq!(caps.get(0).unwrap().column, 6);
    assert!(Trigger::ArrayLiteral.matches("let lines = []"));
    assert!(!Trigger::ArrayLiteral.matches("const item = [];"));
    assert!(!Trigger::ArrayLiteral.matches("const items = [1, 2];"));
  }

  #[test]
  fn declaration_shape() {
    let caps = Trigger::Declaration.captures("let count = 0;").unwrap();
    assert_eq!(texts(&caps), ["count"]);
    assert!(Trigger::Declaration.matches("const elements = []"));
    assert!(!Trigger::Declaration.matches("constant = 1"));
    assert!(!Trigger::Declaration.matches("const { a } = b;"));
    assert!(!Trigger::Declaration.matches("x = 1; const y = 2;"));
  }

  #[test]
  fn collection_and_scalar_are_disjoint() {
    assert!(Trigger::Collection.matches("const elements = []"));
    assert!(Trigger::Collection.matches("const users = await load();"));
    assert!(!Trigger::Collection.matches("let users = [];"));
    assert!(!Trigger::Scalar.matches("const elements = []"));
    assert!(Trigger::Scalar.matches("const isValid = x > 0"));
    assert!(Trigger::Scalar.matches("let users = [];"));
  }

  #[test]
  fn conditional_shape() {
    let caps = Trigger::Conditional.captures("if (isValid(x) && y) {").unwrap();
    assert_eq!(texts(&caps), ["isValid(x) && y"]);
    assert_eq!(caps.get(0).unwrap().column, 4);

    let caps = Trigger::Conditional.captures("if (a &&").unwrap();
    assert_eq!(texts(&caps), ["a &&"]);

    assert!(!Trigger::Conditional.matches("if(x) {"));
    assert!(!Trigger::Conditional.matches("else if (x) {"));
  }

  #[test]
  fn for_of_shape() {
    let caps = Trigger::ForOf
      .captures("for (const element of elements) {")
      .unwrap();
    assert_eq!(texts(&caps), ["element", "elements"]);
    assert_eq!(caps.get(0).unwrap().column, 11);
    assert_eq!(caps.get(1).unwrap().column, 22);
    assert!(!Trigger::ForOf.matches("for (let i = 0; i < n; i++) {"));
  }

  #[test]
  fn collection_binding_derives_singular_only_when_needed() {
    let caps = Trigger::Collection.captures("const boxes = []").unwrap();
    let push = &REFACTOR_RULES[1];
    assert_eq!(push.bindings(&caps).get(Placeholder::Element), Some("box"));

    let guard = &REFACTOR_RULES[2];
    assert_eq!(guard.bindings(&caps).get(Placeholder::Element), None);
  }

  #[test]
  fn every_rule_renders_without_markers() {
    let lines = [
      "const elements = []",
      "const isValid = x > 0",
      "if (ready) {",
      "for (const entry of entries) {",
    ];
    for rule in REFACTOR_RULES.iter().chain(ANNOTATION_RULES.iter()) {
      for line in lines {
        if let Some(rendered) = rule.evaluate(line).unwrap() {
          assert!(!template::has_markers(&rendered.text), "{}", rule.name);
          assert!(!template::has_markers(&rendered.title), "{}", rule.name);
        }
      }
    }
  }

  #[test]
  fn snippet_labels_are_unique() {
    let mut labels: Vec<&str> = SNIPPETS
      .iter()
      .flat_map(|entry| entry.labels.iter().copied())
      .collect();
    let total = labels.len();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), total);
  }
}
