//! Character-offset helpers
//!
//! Offsets throughout the model count Unicode scalar values (`char`s), which
//! is also the unit of the flattened text handed to the spell checker.

/// Number of chars in `s`
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the char at `char_offset`, or `s.len()` past the end
pub fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// Substring between two char offsets, clamped to the string
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let start = byte_index(s, start);
    let end = byte_index(s, end).max(start);
    &s[start..end]
}

/// Split at a char offset
pub fn split_at_char(s: &str, char_offset: usize) -> (&str, &str) {
    s.split_at(byte_index(s, char_offset))
}

/// Word characters for cursor word scans: letters, digits and `_`
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Char range of the word touching `offset`, scanning left and right.
/// Returns `None` when no word character is adjacent to the cursor.
pub fn word_range_at(s: &str, offset: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = s.chars().collect();
    let offset = offset.min(chars.len());

    let mut start = offset;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }

    (start < end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_slicing() {
        let s = "naïve café";
        assert_eq!(char_len(s), 10);
        assert_eq!(char_slice(s, 6, 10), "café");
        assert_eq!(char_slice(s, 8, 50), "fé");
        assert_eq!(split_at_char(s, 5), ("naïve", " café"));
    }

    #[test]
    fn test_word_range_inside_word() {
        let text = "received the receipt today";
        assert_eq!(word_range_at(text, 15), Some((13, 20)));
        assert_eq!(char_slice(text, 13, 20), "receipt");
    }

    #[test]
    fn test_word_range_at_edges() {
        let text = "received the receipt today";
        assert_eq!(word_range_at(text, 13), Some((13, 20)));
        assert_eq!(word_range_at(text, 20), Some((13, 20)));
        assert_eq!(word_range_at(text, 0), Some((0, 8)));
    }

    #[test]
    fn test_word_range_without_word() {
        assert_eq!(word_range_at("a  b", 2), None);
        assert_eq!(word_range_at("", 0), None);
        assert_eq!(word_range_at("-- ", 1), None);
    }
}
