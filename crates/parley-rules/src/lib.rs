//! # parley-rules
//!
//! Deterministic canned-reply matching. Rules are checked before any
//! retrieval or generation work happens, so a hit answers the user without
//! spending an API call.
//!
//! Each rule carries a pattern that is compiled as a case-insensitive
//! regex; patterns that fail to compile degrade to case-insensitive
//! substring matching instead of being dropped.

#![deny(unsafe_code)]

pub mod loader;
pub mod matcher;

pub use loader::{load_rules_from_path, RulesFileError};
pub use matcher::{
    Rule, RuleAction, RuleMatch, RuleMatcher, REGEX_CONFIDENCE, SUBSTRING_CONFIDENCE,
};
