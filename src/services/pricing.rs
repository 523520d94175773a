//! Profile-category discounts.
//!
//! Pure lookup, no I/O and no failure path: unknown categories pay the list
//! price. The helper returns the exact product; rounding to minor units
//! happens once, at the payment-provider boundary.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::entities::profile;
use crate::services::images::normalize_category;

/// Verification status a profile must hold before discounts apply
pub const VERIFIED: &str = "verified";

/// Multiplier applied to the base price for a profile category.
/// Accepts both the storefront's French labels and their English slugs.
pub fn discount_factor(profile_category: &str) -> Decimal {
    match normalize_category(profile_category).as_str() {
        "student" | "etudiant" | "etudiante" => dec!(0.80),
        "retiree" | "retraite" | "retraitee" | "senior" => dec!(0.90),
        "job-seeker" | "jobseeker" | "demandeur d'emploi" | "demandeur demploi" => dec!(0.75),
        _ => Decimal::ONE,
    }
}

/// Discounted price for a base price and profile category. Deterministic;
/// does not mutate its inputs; unknown categories return the base unchanged.
pub fn discounted_price(base_price: Decimal, profile_category: &str) -> Decimal {
    base_price * discount_factor(profile_category)
}

/// The category a profile may claim discounts under, gated on verification.
pub fn eligible_category(profile: &profile::Model) -> Option<&str> {
    if profile.verification_status == VERIFIED {
        Some(profile.profile_category.as_str())
    } else {
        None
    }
}
