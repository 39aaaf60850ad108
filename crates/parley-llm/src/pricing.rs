//! Static model pricing and cost calculation.
//!
//! Prices are USD per million tokens. Lookup is exact-match first, then
//! longest-prefix, then a conservative default so unknown models are
//! never billed at zero.

use crate::events::TokenUsage;

/// Pricing for one model, in USD per million tokens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingTier {
    /// Cost per million prompt tokens.
    pub input_per_million: f64,
    /// Cost per million completion tokens.
    pub output_per_million: f64,
}

/// Known model prices. Ordered longest-prefix-first so `gpt-4-turbo`
/// never falls through to the `gpt-4` row.
const PRICING: &[(&str, PricingTier)] = &[
    (
        "gpt-4-turbo",
        PricingTier {
            input_per_million: 10.0,
            output_per_million: 30.0,
        },
    ),
    (
        "gpt-3.5-turbo",
        PricingTier {
            input_per_million: 0.5,
            output_per_million: 1.5,
        },
    ),
    (
        "gpt-4",
        PricingTier {
            input_per_million: 30.0,
            output_per_million: 60.0,
        },
    ),
];

/// Default tier for unrecognized models (priced as `gpt-4-turbo`).
const DEFAULT_TIER: PricingTier = PricingTier {
    input_per_million: 10.0,
    output_per_million: 30.0,
};

/// Look up the pricing tier for a model identifier.
///
/// Exact match first, then prefix match (dated snapshots like
/// `gpt-4-turbo-2024-04-09` share their family's price), then the
/// default tier.
#[must_use]
pub fn pricing_tier(model: &str) -> PricingTier {
    for (name, tier) in PRICING {
        if model == *name {
            return *tier;
        }
    }
    for (name, tier) in PRICING {
        if model.starts_with(name) {
            return *tier;
        }
    }
    DEFAULT_TIER
}

/// Calculate the cost of one generation in USD.
#[must_use]
#[allow(clippy::cast_precision_loss)] // token counts never approach 2^52
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> f64 {
    let tier = pricing_tier(model);
    usage.input_tokens as f64 / 1_000_000.0 * tier.input_per_million
        + usage.output_tokens as f64 / 1_000_000.0 * tier.output_per_million
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches() {
        assert_eq!(pricing_tier("gpt-4-turbo").input_per_million, 10.0);
        assert_eq!(pricing_tier("gpt-4").input_per_million, 30.0);
        assert_eq!(pricing_tier("gpt-3.5-turbo").output_per_million, 1.5);
    }

    #[test]
    fn turbo_snapshot_does_not_fall_through_to_gpt_4() {
        assert_eq!(pricing_tier("gpt-4-turbo-2024-04-09").input_per_million, 10.0);
        assert_eq!(pricing_tier("gpt-4-0613").input_per_million, 30.0);
    }

    #[test]
    fn unknown_model_uses_default_tier() {
        assert_eq!(pricing_tier("some-new-model"), DEFAULT_TIER);
    }

    #[test]
    fn cost_calculation() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 500_000,
        };
        let cost = calculate_cost("gpt-4-turbo", &usage);
        assert!((cost - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_usage_costs_nothing() {
        assert_eq!(calculate_cost("gpt-4-turbo", &TokenUsage::default()), 0.0);
    }
}
