//! Naive plural to singular conversion for collection identifiers.
//!
//! The rules are a fixed suffix table, checked in order:
//!
//! | suffix                  | rule              | example               |
//! |-------------------------|-------------------|-----------------------|
//! | `ies`                   | `-ies` + `y`      | `entries` -> `entry`  |
//! | `ces`                   | drop last char    | `services` -> `service` |
//! | `ches`, `sses`, `xes`   | drop last 2 chars | `boxes` -> `box`      |
//! | anything else           | drop last char    | `dogs` -> `dog`       |
//!
//! Irregular plurals and singular words ending in `s` come out wrong
//! (`people` -> `peopl`, `status` -> `statu`). Callers rely on these exact
//! outputs, so the table stays as is.

use crate::Tendril;

/// Whether `word` looks like a collection name, i.e. ends in `s`.
#[inline]
pub fn is_plural(word: &str) -> bool {
  word.ends_with('s')
}

pub fn to_singular(word: &str) -> Tendril {
  let mut res = Tendril::new();
  to_singular_with(word, &mut res);
  res
}

pub fn to_singular_with(word: &str, buf: &mut Tendril) {
  if let Some(stem) = word.strip_suffix("ies") {
    buf.push_str(stem);
    buf.push('y');
    return;
  }

  let strip = if word.ends_with("ces") {
    1
  } else if word.ends_with("ches") || word.ends_with("sses") || word.ends_with("xes") {
    2
  } else {
    1
  };
  buf.push_str(drop_last_chars(word, strip));
}

fn drop_last_chars(word: &str, n: usize) -> &str {
  let end = word
    .char_indices()
    .rev()
    .nth(n.saturating_sub(1))
    .map_or(0, |(idx, _)| idx);
  &word[..end]
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;

  #[test]
  fn suffix_rules() {
    assert_eq!(to_singular("entries").as_str(), "entry");
    assert_eq!(to_singular("services").as_str(), "service");
    assert_eq!(to_singular("boxes").as_str(), "box");
    assert_eq!(to_singular("classes").as_str(), "class");
    assert_eq!(to_singular("matches").as_str(), "match");
    assert_eq!(to_singular("dogs").as_str(), "dog");
    assert_eq!(to_singular("elements").as_str(), "element");
    assert_eq!(to_singular("values").as_str(), "value");
  }

  #[test]
  fn rule_precedence() {
    assert_eq!(to_singular("indices").as_str(), "indice");
    assert_eq!(to_singular("cookies").as_str(), "cooky");
  }

  #[test]
  fn known_limitations_are_kept() {
    assert_eq!(to_singular("people").as_str(), "peopl");
    assert_eq!(to_singular("status").as_str(), "statu");
    assert_eq!(to_singular("s").as_str(), "");
    assert_eq!(to_singular("").as_str(), "");
  }

  #[test]
  fn non_ascii_words() {
    assert_eq!(to_singular("cafés").as_str(), "café");
    assert_eq!(to_singular("ü").as_str(), "");
  }

  #[test]
  fn plural_shape() {
    assert!(is_plural("items"));
    assert!(!is_plural("item"));
    assert!(!is_plural(""));
  }

  quickcheck! {
    fn singular_is_deterministic(word: String) -> bool {
      to_singular(&word) == to_singular(&word)
    }

    fn singular_never_grows_past_one_char(word: String) -> bool {
      to_singular(&word).chars().count() <= word.chars().count().max(1)
    }
  }
}
