//! Price breakdown calculation
//!
//! All monetary values are integer minor currency units (cents). The only
//! non-integer step is the single platform-fee multiply-and-round; every
//! downstream sum stays in integers.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

use crate::utils::AppError;

/// Platform commission: 15% of the subtotal
const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Maximum allowed price per day (minor units, €100,000.00)
pub const MAX_PRICE_PER_DAY_MINOR: i64 = 10_000_000;
/// Maximum allowed days per booking
pub const MAX_BOOKING_DAYS: u32 = 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("price per day must be positive, got {0}")]
    NonPositivePrice(i64),

    #[error("price per day exceeds maximum allowed ({MAX_PRICE_PER_DAY_MINOR}), got {0}")]
    PriceTooLarge(i64),

    #[error("number of days must be positive")]
    ZeroDays,

    #[error("number of days exceeds maximum allowed ({MAX_BOOKING_DAYS}), got {0}")]
    TooManyDays(u32),
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Deterministic split of a booking total, minor units.
/// Always satisfies `owner_amount + platform_fee == subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub platform_fee: i64,
    pub owner_amount: i64,
}

/// Compute the price breakdown for a rental.
///
/// `platform_fee = round(subtotal * 0.15)`, half away from zero on the
/// minor-unit value; the owner amount is the exact remainder.
pub fn quote(price_per_day_minor: i64, days: u32) -> Result<PriceBreakdown, PricingError> {
    if price_per_day_minor <= 0 {
        return Err(PricingError::NonPositivePrice(price_per_day_minor));
    }
    if price_per_day_minor > MAX_PRICE_PER_DAY_MINOR {
        return Err(PricingError::PriceTooLarge(price_per_day_minor));
    }
    if days == 0 {
        return Err(PricingError::ZeroDays);
    }
    if days > MAX_BOOKING_DAYS {
        return Err(PricingError::TooManyDays(days));
    }

    // Bounds above keep this well inside i64 range
    let subtotal = price_per_day_minor * days as i64;

    let platform_fee = (Decimal::from(subtotal) * PLATFORM_FEE_RATE)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0);

    Ok(PriceBreakdown {
        subtotal,
        platform_fee,
        owner_amount: subtotal - platform_fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_standard_rental() {
        // 3 days at €200.00/day
        let breakdown = quote(20000, 3).unwrap();
        assert_eq!(breakdown.subtotal, 60000);
        assert_eq!(breakdown.platform_fee, 9000);
        assert_eq!(breakdown.owner_amount, 51000);
    }

    #[test]
    fn fee_rounds_half_away_from_zero() {
        // subtotal 30: fee = 4.5 → 5
        let breakdown = quote(30, 1).unwrap();
        assert_eq!(breakdown.platform_fee, 5);
        assert_eq!(breakdown.owner_amount, 25);

        // subtotal 29: fee = 4.35 → 4
        let breakdown = quote(29, 1).unwrap();
        assert_eq!(breakdown.platform_fee, 4);
        assert_eq!(breakdown.owner_amount, 25);
    }

    #[test]
    fn split_always_sums_to_subtotal() {
        for price in [1, 7, 99, 12345, 20000, MAX_PRICE_PER_DAY_MINOR] {
            for days in [1, 2, 3, 30, MAX_BOOKING_DAYS] {
                let b = quote(price, days).unwrap();
                assert_eq!(b.platform_fee + b.owner_amount, b.subtotal);
            }
        }
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(quote(0, 3), Err(PricingError::NonPositivePrice(0)));
        assert_eq!(quote(-100, 3), Err(PricingError::NonPositivePrice(-100)));
        assert_eq!(quote(20000, 0), Err(PricingError::ZeroDays));
        assert_eq!(
            quote(MAX_PRICE_PER_DAY_MINOR + 1, 1),
            Err(PricingError::PriceTooLarge(MAX_PRICE_PER_DAY_MINOR + 1))
        );
        assert_eq!(quote(20000, 366), Err(PricingError::TooManyDays(366)));
    }
}
