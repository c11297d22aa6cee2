use crate::analysis::stats;
use crate::domain::profile::UserProfile;
use crate::domain::recommendation::ScoredCandidate;

pub const NEUTRAL_CONFIDENCE: f64 = 0.5;
const REQUIRED_PROFILE_FIELDS: f64 = 5.0;

/// Fraction of the five required profile fields that are present and non-empty.
pub fn profile_completeness(profile: &UserProfile) -> f64 {
    let price = &profile.price_preference;
    let present = [
        // Enums always carry a value once the profile exists.
        true,
        !profile.preferred_sectors.is_empty(),
        true,
        price.min.is_finite() && price.max.is_finite() && price.min < price.max,
        !profile.market_cap_preference.trim().is_empty(),
    ];
    present.iter().filter(|p| **p).count() as f64 / REQUIRED_PROFILE_FIELDS
}

/// Overall confidence in [0.1, 1.0]; an empty list yields [`NEUTRAL_CONFIDENCE`].
pub fn overall_confidence(recommendations: &[ScoredCandidate], profile: &UserProfile) -> f64 {
    let totals: Vec<f64> = recommendations.iter().map(|c| c.total_score).collect();
    let Some(avg) = stats::mean(&totals) else {
        return NEUTRAL_CONFIDENCE;
    };
    let confidence = 0.7 * (avg / 100.0) + 0.3 * profile_completeness(profile);
    if confidence.is_nan() {
        return NEUTRAL_CONFIDENCE;
    }
    confidence.clamp(0.1, 1.0)
}
