//! Category price profiles and the condition-adjusted pricing rules.

use crate::models::{DEFAULT_CURRENCY, PriceEstimate, PriceOptions, PriceRange, PricingBreakdown};

/// Profile used when the category is missing or unknown.
pub const DEFAULT_CATEGORY: &str = "electronics";

/// Condition assumed when none, or an unrecognized one, is given.
pub const DEFAULT_CONDITION: &str = "good";

/// Typical market prices for a category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

pub static CATEGORY_PROFILES: [CategoryProfile; 5] = [
    CategoryProfile {
        name: "electronics",
        min: 100.0,
        max: 800.0,
        avg: 450.0,
    },
    CategoryProfile {
        name: "jewelry",
        min: 50.0,
        max: 2000.0,
        avg: 500.0,
    },
    CategoryProfile {
        name: "collectibles",
        min: 20.0,
        max: 1500.0,
        avg: 300.0,
    },
    CategoryProfile {
        name: "art",
        min: 100.0,
        max: 5000.0,
        avg: 1200.0,
    },
    CategoryProfile {
        name: "furniture",
        min: 50.0,
        max: 1200.0,
        avg: 400.0,
    },
];

const CONDITION_MULTIPLIERS: [(&str, f64); 6] = [
    ("new", 1.0),
    ("like_new", 0.85),
    ("excellent", 0.75),
    ("good", 0.60),
    ("fair", 0.40),
    ("poor", 0.20),
];

/// Multiplier of the `good` condition.
const DEFAULT_CONDITION_MULTIPLIER: f64 = 0.60;

const CONFIDENCE_SCALE: f64 = 0.9;
const BASE_RANGE_FACTOR: f64 = 0.2;
const UNCERTAINTY_RANGE_FACTOR: f64 = 0.3;

/// Look up a category profile, case-insensitively.
pub fn category_profile(category: Option<&str>) -> &'static CategoryProfile {
    let wanted = category.map(|c| c.trim().to_lowercase());
    CATEGORY_PROFILES
        .iter()
        .find(|p| wanted.as_deref() == Some(p.name))
        .unwrap_or(&CATEGORY_PROFILES[0])
}

/// Multiplier for an item condition. `like new` and `like-new` are accepted.
pub fn condition_multiplier(condition: Option<&str>) -> f64 {
    let key = condition
        .map(|c| c.trim().to_lowercase().replace([' ', '-'], "_"))
        .unwrap_or_else(|| DEFAULT_CONDITION.to_string());

    CONDITION_MULTIPLIERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_CONDITION_MULTIPLIER)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply the condition multiplier and derive a confidence-dependent range.
///
/// The range widens from 20% at full confidence to 50% at zero confidence.
pub fn calculate_price(
    base_market_value: f64,
    condition: Option<&str>,
    ai_confidence: f64,
    options: &PriceOptions,
) -> PriceEstimate {
    let multiplier = condition_multiplier(condition);
    let estimated_price = round2(base_market_value * multiplier);

    let confidence = (ai_confidence * CONFIDENCE_SCALE)
        .min(options.confidence_cap)
        .clamp(0.0, 1.0);
    let range_factor = BASE_RANGE_FACTOR + (1.0 - confidence) * UNCERTAINTY_RANGE_FACTOR;

    PriceEstimate {
        estimated_price,
        currency: DEFAULT_CURRENCY.to_string(),
        price_range: PriceRange {
            min: round2(estimated_price * (1.0 - range_factor)),
            max: round2(estimated_price * (1.0 + range_factor)),
            currency: DEFAULT_CURRENCY.to_string(),
        },
        confidence_score: confidence,
        pricing_breakdown: PricingBreakdown {
            base_market_value,
            condition_multiplier: multiplier,
            condition_adjusted: estimated_price,
            final_estimate: estimated_price,
        },
    }
}
