//! Text generators run on a selection, returning text for the client to place.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
  comment::annotation_line,
  pluralize::{
    is_plural,
    to_singular,
  },
};

static DOC_DESCRIPTION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"/\*\*\s(?s:(.+?\.))").expect("valid doc comment regex"));

static FUNCTION_NAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\w+?\(\)").expect("valid function name regex"));

static METHOD_CALL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\w+)\.(\w+)").expect("valid method call regex"));

static ASSIGNED_NAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\w+)\s=").expect("valid assignment regex"));

/// Array methods whose callback takes the element first.
pub const CALLBACK_METHODS: [&str; 9] = [
  "every",
  "filter",
  "findIndex",
  "forEach",
  "map",
  "some",
  "sort",
  "reduce",
  "reduceRight",
];

/// A `describe`/`it` skeleton from a doc comment and the `name()` after it.
///
/// The description is the first sentence of the doc comment.
pub fn unit_test(text: &str) -> Option<String> {
  let name = FUNCTION_NAME.find(text)?.as_str();
  let description = DOC_DESCRIPTION.captures(text)?.get(1)?.as_str();
  let description = description
    .split_whitespace()
    .filter(|word| *word != "*")
    .collect::<Vec<_>>()
    .join(" ");

  Some(format!(
    "describe('{name}', function () {{\n\
     \tit('should {description}', function () {{\n\
     \n\
     \t\tassert.equal();\n\
     \t}});\n\
     }});"
  ))
}

/// `(item => item);` for `items.forEach` and the other [`CALLBACK_METHODS`].
pub fn array_method_callback(text: &str) -> Option<String> {
  let caps = METHOD_CALL.captures(text)?;
  let (collection, method) = (&caps[1], &caps[2]);
  if !is_plural(collection) || !CALLBACK_METHODS.contains(&method) {
    return None;
  }
  let element = to_singular(collection);
  Some(format!("({element} => {element});"))
}

/// The start of an annotation for the name assigned in `text`, such as
/// ``// Let `items` be``.
pub fn declaration_annotation(text: &str, comment_token: &str) -> Option<String> {
  let name = ASSIGNED_NAME.captures(text)?.get(1)?.as_str();
  Some(annotation_line("", comment_token, &format!("Let `{name}` be")))
}
