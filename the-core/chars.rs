/// Word characters are the ones a `\w` regex class accepts: identifiers in the
/// scanned source are runs of these.
#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

/// Char index where the run of word characters ending at `end` starts.
///
/// Returns `end` when the char before `end` is not a word char.
pub fn word_start_before(chars: &[char], end: usize) -> usize {
  let end = end.min(chars.len());
  chars[..end]
    .iter()
    .rposition(|&ch| !char_is_word(ch))
    .map_or(0, |idx| idx + 1)
}

/// Char range of the word run that contains or touches `idx`, if any.
pub fn word_around(chars: &[char], idx: usize) -> Option<(usize, usize)> {
  let idx = idx.min(chars.len());
  let start = word_start_before(chars, idx);
  let end = chars[idx..]
    .iter()
    .position(|&ch| !char_is_word(ch))
    .map_or(chars.len(), |offset| idx + offset);
  (start < end).then_some((start, end))
}
