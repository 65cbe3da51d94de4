//! Canonical theme vocabulary
//!
//! The analysis backend is instructed to label themes from this closed list.
//! Labels outside it are dropped during response validation so the aggregate
//! tables never accumulate free-form strings.

/// Closed set of theme labels the pipeline accepts
pub const THEME_VOCABULARY: [&str; 30] = [
    "delivery speed",
    "delivery cost",
    "courier service",
    "pickup points",
    "packaging",
    "order accuracy",
    "product quality",
    "product durability",
    "product appearance",
    "sizing",
    "product description",
    "product photos",
    "assembly",
    "instructions",
    "price",
    "value for money",
    "discounts",
    "loyalty program",
    "stock availability",
    "customer support",
    "support response time",
    "communication",
    "returns",
    "refunds",
    "warranty",
    "website usability",
    "mobile app",
    "checkout",
    "payment",
    "overall experience",
];

/// Map a backend-produced label to its canonical form
///
/// Matching is case-insensitive and ignores surrounding whitespace. Returns
/// None when the label is not in the vocabulary.
pub fn canonical_theme(label: &str) -> Option<&'static str> {
    let trimmed = label.trim();
    THEME_VOCABULARY
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
        .copied()
}
