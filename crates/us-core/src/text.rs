//! String utilities for index-friendly prefix queries.

/// Given a non-empty string `s`, returns the least string `y` such that
/// `s` is not a prefix of `y`.
///
/// The strings `z` with `s` as a prefix are then exactly `s <= z < y`,
/// which lets a prefix filter use plain range comparisons (and therefore a
/// column index) instead of pattern matching.
///
/// The last code point is incremented, skipping the surrogate gap. The
/// contract is not honored for the empty string (every string has it as a
/// prefix), nor when the last code point is the maximum code point.
pub fn next_string(s: &str) -> String {
    let Some(last) = s.chars().last() else {
        return String::new();
    };
    let stem = &s[..s.len() - last.len_utf8()];

    let mut next = last as u32 + 1;
    if (0xD800..=0xDFFF).contains(&next) {
        next = 0xE000;
    }
    let mut out = String::with_capacity(s.len() + 1);
    out.push_str(stem);
    match char::from_u32(next) {
        Some(c) => out.push(c),
        // Last code point was char::MAX; no successor exists, so extend.
        None => {
            out.push(last);
            out.push('\u{0}');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_last_character() {
        assert_eq!(next_string("abc"), "abd");
        assert_eq!(next_string("a"), "b");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(next_string(""), "");
    }

    #[test]
    fn handles_multi_byte_last_character() {
        assert_eq!(next_string("caf\u{00E9}"), "caf\u{00EA}");
        assert_eq!(next_string("\u{4E2D}"), "\u{4E2E}");
    }

    #[test]
    fn skips_the_surrogate_gap() {
        assert_eq!(next_string("\u{D7FF}"), "\u{E000}");
    }

    #[test]
    fn bounds_a_prefix_range() {
        let query = "ki";
        let upper = next_string(query);
        for candidate in ["ki", "kitten", "ki\u{10FFFF}"] {
            assert!(candidate >= query && candidate < upper.as_str());
        }
        for candidate in ["k", "kj", "zebra"] {
            assert!(!(candidate >= query && candidate < upper.as_str()));
        }
    }
}
