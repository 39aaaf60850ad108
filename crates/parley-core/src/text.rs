//! UTF-8–safe string truncation utilities.
//!
//! `&str[..n]` panics when `n` falls inside a multi-byte character; these
//! helpers snap back to the nearest char boundary so truncation is always
//! safe. Used for document snippets and log previews.

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate `s` and append `suffix` if the original exceeds `max_bytes`.
///
/// The returned string is at most `max_bytes` bytes (including the
/// suffix). If the string fits it is returned as-is.
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let budget = max_bytes.saturating_sub(suffix.len());
    let mut out = truncate_str(s, budget).to_owned();
    out.push_str(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncates_at_byte_budget() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn snaps_back_at_multibyte_boundary() {
        // 'é' is 2 bytes; cutting at 4 lands mid-char and snaps back.
        assert_eq!(truncate_str("caféteria", 4), "caf");
        assert_eq!(truncate_str("caféteria", 5), "café");
    }

    #[test]
    fn zero_budget() {
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn suffix_applied_only_when_truncated() {
        assert_eq!(truncate_with_suffix("hello", 10, "..."), "hello");
        assert_eq!(truncate_with_suffix("hello world", 8, "..."), "hello...");
    }

    #[test]
    fn suffix_longer_than_budget() {
        assert_eq!(truncate_with_suffix("hello world", 2, "..."), "...");
    }
}
