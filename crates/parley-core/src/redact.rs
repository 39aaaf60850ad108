//! Ordered PII redaction.
//!
//! Applied to a working copy of the inbound text before any downstream
//! stage sees it — the rule matcher, retrieval query, generation prompt,
//! and delivered transcript only ever carry the placeholders.
//!
//! Pattern order matters because patterns overlap: the 11-digit national
//! id must run before the generic 10–11-digit phone pattern or every id
//! would be mislabeled as a phone number. Keep the list ordered from most
//! to least specific.

use std::sync::LazyLock;

use regex::Regex;

/// One redaction step: pattern and its replacement placeholder.
struct Redaction {
    pattern: Regex,
    placeholder: &'static str,
}

static REDACTIONS: LazyLock<Vec<Redaction>> = LazyLock::new(|| {
    // Order is load-bearing; see module docs.
    [
        (r"\b\d{11}\b", "[NATIONAL_ID_REDACTED]"),
        (
            r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
            "[CARD_NO_REDACTED]",
        ),
        (r"\b[\w.-]+@[\w.-]+\.\w+\b", "[EMAIL_REDACTED]"),
        (r"\b\d{3}-\d{2}-\d{4}\b", "[SSN_REDACTED]"),
        (r"\b\d{10,11}\b", "[PHONE_REDACTED]"),
    ]
    .into_iter()
    .map(|(pattern, placeholder)| Redaction {
        pattern: Regex::new(pattern).expect("redaction patterns are compile-time constants"),
        placeholder,
    })
    .collect()
});

/// Replace every personally-identifying span in `text` with its
/// placeholder, applying patterns in their fixed order.
pub fn redact_text(text: &str) -> String {
    let mut result = text.to_string();
    for redaction in REDACTIONS.iter() {
        result = redaction
            .pattern
            .replace_all(&result, redaction.placeholder)
            .into_owned();
    }
    result
}
