//! Placeholder substitution for snippet and annotation templates.
//!
//! A template is plain text with caret-delimited markers such as
//! `^collection^`. Rendering replaces every occurrence of every marker with
//! its bound value. A marker without a binding is a catalog defect and fails
//! with [`TemplateError::Unbound`] instead of leaking into the output.
//!
//! ```
//! use the_lib::template::{
//!   Bindings,
//!   Placeholder,
//!   render,
//! };
//!
//! let bindings = Bindings::new()
//!   .with(Placeholder::Collection, "items")
//!   .with(Placeholder::Element, "item");
//! let text = render("for (const ^element^ of ^collection^) {}", &bindings).unwrap();
//! assert_eq!(text, "for (const item of items) {}");
//! ```

use smallvec::SmallVec;
use thiserror::Error;

use crate::Tendril;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
  #[error("template marker {marker} has no bound value")]
  Unbound { marker: &'static str },
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
  /// A plural identifier naming a collection.
  Collection,
  /// The singular derived from [`Placeholder::Collection`].
  Element,
  /// An identifier used as is.
  Identifier,
  /// The first word of a completion label.
  Label,
  /// The expression inside an `if (...)`.
  Condition,
}

impl Placeholder {
  pub const ALL: [Placeholder; 5] = [
    Placeholder::Collection,
    Placeholder::Element,
    Placeholder::Identifier,
    Placeholder::Label,
    Placeholder::Condition,
  ];

  pub const fn marker(self) -> &'static str {
    match self {
      Self::Collection => "^collection^",
      Self::Element => "^element^",
      Self::Identifier => "^identifier^",
      Self::Label => "^label^",
      Self::Condition => "^condition^",
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bindings {
  values: SmallVec<[(Placeholder, Tendril); 4]>,
}

impl Bindings {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds `placeholder`, replacing any previous value.
  pub fn bind(&mut self, placeholder: Placeholder, value: impl Into<Tendril>) -> &mut Self {
    let value = value.into();
    match self.values.iter_mut().find(|(p, _)| *p == placeholder) {
      Some((_, slot)) => *slot = value,
      None => self.values.push((placeholder, value)),
    }
    self
  }

  #[must_use]
  pub fn with(mut self, placeholder: Placeholder, value: impl Into<Tendril>) -> Self {
    self.bind(placeholder, value);
    self
  }

  pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
    self
      .values
      .iter()
      .find(|(p, _)| *p == placeholder)
      .map(|(_, value)| value.as_str())
  }

  pub fn is_bound(&self, placeholder: Placeholder) -> bool {
    self.get(placeholder).is_some()
  }

  /// Whether every marker used by `template` has a value.
  pub fn covers(&self, template: &str) -> bool {
    placeholders(template).all(|placeholder| self.is_bound(placeholder))
  }
}

/// Markers that occur in `template`, in [`Placeholder::ALL`] order.
pub fn placeholders(template: &str) -> impl Iterator<Item = Placeholder> + '_ {
  Placeholder::ALL
    .into_iter()
    .filter(move |placeholder| template.contains(placeholder.marker()))
}

/// Whether `text` still contains any marker.
pub fn has_markers(text: &str) -> bool {
  placeholders(text).next().is_some()
}

pub fn render(template: &str, bindings: &Bindings) -> Result<String> {
  let mut out = template.to_string();
  for placeholder in placeholders(template) {
    let marker = placeholder.marker();
    let value = bindings
      .get(placeholder)
      .ok_or(TemplateError::Unbound { marker })?;
    out = out.replace(marker, value);
  }
  Ok(out)
}
