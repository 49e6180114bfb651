//! Line comment helpers for annotation lines.
//!
//! An annotation is a line whose first non-whitespace text is the comment
//! token. Everything here works on one line at a time.

pub const DEFAULT_COMMENT_TOKEN: &str = "//";

/// Whether `line` is a line comment for `token`.
pub fn is_line_comment(line: &str, token: &str) -> bool {
  !token.is_empty() && line.trim_start().starts_with(token)
}

/// The leading whitespace of `line`.
pub fn indentation(line: &str) -> &str {
  let body = line.trim_start();
  &line[..line.len() - body.len()]
}

/// Formats an annotation line without a line ending: the indentation, the
/// token, one space, then `text`.
pub fn annotation_line(indent: &str, token: &str, text: &str) -> String {
  let mut line = String::with_capacity(indent.len() + token.len() + 1 + text.len());
  line.push_str(indent);
  line.push_str(token);
  line.push(' ');
  line.push_str(text);
  line
}
