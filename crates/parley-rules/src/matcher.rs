//! Rule definitions and the matcher over them.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Confidence reported for a rule whose pattern compiled as a regex.
pub const REGEX_CONFIDENCE: f64 = 0.95;

/// Confidence reported for a rule degraded to substring matching.
pub const SUBSTRING_CONFIDENCE: f64 = 0.85;

/// What a matched rule asks the pipeline to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Send the rule's reply verbatim.
    #[default]
    Reply,
    /// Send the reply as a handoff notice (human queue, other channel).
    Route,
    /// Skip the canned reply and force the retrieval path.
    Rag,
    /// Send the reply as an expandable macro.
    Macro,
}

/// A single canned-reply rule as it appears in the rules file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier used in logs and match results.
    pub name: String,
    /// Pattern matched against the incoming text.
    pub pattern: String,
    /// Reply sent verbatim when the rule matches.
    pub reply: String,
    /// What the pipeline does with the reply.
    #[serde(default)]
    pub action: RuleAction,
    /// Evaluation order; lower values are checked first.
    #[serde(default)]
    pub order: u32,
}

/// Result of a successful rule match.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleMatch {
    /// Name of the rule that matched.
    pub rule_name: String,
    /// The canned reply.
    pub reply: String,
    /// Match confidence; regex hits score higher than substring hits.
    pub confidence: f64,
    /// The matched rule's action.
    pub action: RuleAction,
}

enum Pattern {
    Regex(Regex),
    Substring(String),
}

struct CompiledRule {
    name: String,
    reply: String,
    action: RuleAction,
    pattern: Pattern,
}

/// Matches incoming text against an ordered list of rules.
///
/// Rules are evaluated in ascending `order` (ties broken by list
/// position), and the first hit wins.
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

impl RuleMatcher {
    /// Compile a rule list into a matcher.
    ///
    /// Patterns that fail to compile as regexes are kept as
    /// case-insensitive substring patterns rather than rejected, so one
    /// bad pattern in the file cannot disable the rest.
    #[must_use]
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.order);
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = match RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => Pattern::Regex(re),
                    Err(err) => {
                        warn!(
                            rule = %rule.name,
                            error = %err,
                            "rule pattern is not a valid regex, falling back to substring match"
                        );
                        Pattern::Substring(rule.pattern.to_lowercase())
                    }
                };
                CompiledRule {
                    name: rule.name,
                    reply: rule.reply,
                    action: rule.action,
                    pattern,
                }
            })
            .collect();
        Self { rules }
    }

    /// Number of loaded rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the matcher holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match `text` against the rules, returning the first hit.
    #[must_use]
    pub fn match_text(&self, text: &str) -> Option<RuleMatch> {
        let lowered = text.to_lowercase();
        for rule in &self.rules {
            let (hit, confidence) = match &rule.pattern {
                Pattern::Regex(re) => (re.is_match(text), REGEX_CONFIDENCE),
                Pattern::Substring(needle) => (lowered.contains(needle), SUBSTRING_CONFIDENCE),
            };
            if hit {
                return Some(RuleMatch {
                    rule_name: rule.name.clone(),
                    reply: rule.reply.clone(),
                    confidence,
                    action: rule.action,
                });
            }
        }
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
