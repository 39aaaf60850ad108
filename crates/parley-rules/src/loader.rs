//! Rules file loading.
//!
//! The rules file is a JSON array of rule objects:
//!
//! ```json
//! [
//!   {"name": "greeting", "pattern": "\\b(hi|hello)\\b", "reply": "Hello!", "order": 0}
//! ]
//! ```

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::matcher::Rule;

/// Errors raised while loading a rules file.
#[derive(Debug, Error)]
pub enum RulesFileError {
    /// Failed to read the rules file from disk.
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse the rules file as a JSON rule array.
    #[error("failed to parse rules JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load rules from a JSON file.
///
/// # Errors
///
/// Returns an error when the file cannot be read or does not parse as a
/// JSON array of rules.
pub fn load_rules_from_path(path: &Path) -> Result<Vec<Rule>, RulesFileError> {
    let content = std::fs::read_to_string(path)?;
    let rules: Vec<Rule> = serde_json::from_str(&content)?;
    info!(?path, count = rules.len(), "loaded rules file");
    Ok(rules)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_rule_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "greeting", "pattern": "hello", "reply": "Hi!"},
                {"name": "hours", "pattern": "opening hours", "reply": "9 to 5.", "order": 2}
            ]"#,
        )
        .unwrap();
        let rules = load_rules_from_path(&path).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].order, 0);
        assert_eq!(rules[1].order, 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rules_from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RulesFileError::Io(_)));
    }

    #[test]
    fn non_array_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"name": "x"}"#).unwrap();
        let err = load_rules_from_path(&path).unwrap_err();
        assert!(matches!(err, RulesFileError::Json(_)));
    }
}
