//! Cancellation refund policy
//!
//! Canonical policy (the one user-facing copy must match): measured against
//! 09:00 business-local time on the rental start date,
//!
//! - 24h or more before start → 100% refund
//! - less than 24h but before start → 50% refund
//! - at or after start → no refund

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::utils::time::date_hms_to_millis;

/// Check-in anchor on the start date, business-local
const START_HOUR: u32 = 9;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Computed refund for a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundQuote {
    /// Refund amount in minor units
    pub amount: i64,
    /// Percentage band applied (100 / 50 / 0)
    pub percentage: u8,
}

/// Refund for cancelling a rental of `total_minor` starting on `start_date`,
/// evaluated at `now_millis`.
pub fn refund_for(total_minor: i64, start_date: NaiveDate, now_millis: i64, tz: Tz) -> RefundQuote {
    let start_at = date_hms_to_millis(start_date, START_HOUR, 0, 0, tz);
    let hours_until_start = (start_at - now_millis) / MILLIS_PER_HOUR;

    let percentage: u8 = if start_at - now_millis >= 24 * MILLIS_PER_HOUR {
        100
    } else if start_at > now_millis {
        50
    } else {
        0
    };

    tracing::debug!(
        target: "policy",
        hours_until_start,
        percentage,
        "Refund band selected"
    );

    let amount = match percentage {
        100 => total_minor,
        0 => 0,
        pct => (Decimal::from(total_minor) * Decimal::from(pct) / Decimal::from(100u8))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0),
    };

    RefundQuote { amount, percentage }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 10).unwrap()
    }

    fn anchor_millis() -> i64 {
        date_hms_to_millis(start(), START_HOUR, 0, 0, Berlin)
    }

    #[test]
    fn full_refund_at_or_beyond_24h() {
        let q = refund_for(60000, start(), anchor_millis() - 30 * MILLIS_PER_HOUR, Berlin);
        assert_eq!(q, RefundQuote { amount: 60000, percentage: 100 });

        // Exactly 24h before is still a full refund
        let q = refund_for(60000, start(), anchor_millis() - 24 * MILLIS_PER_HOUR, Berlin);
        assert_eq!(q.percentage, 100);
    }

    #[test]
    fn half_refund_inside_24h() {
        let q = refund_for(60000, start(), anchor_millis() - 10 * MILLIS_PER_HOUR, Berlin);
        assert_eq!(q, RefundQuote { amount: 30000, percentage: 50 });
    }

    #[test]
    fn half_refund_rounds_half_away_from_zero() {
        let q = refund_for(12345, start(), anchor_millis() - MILLIS_PER_HOUR, Berlin);
        // 6172.5 → 6173
        assert_eq!(q.amount, 6173);
    }

    #[test]
    fn no_refund_at_or_after_start() {
        let q = refund_for(60000, start(), anchor_millis(), Berlin);
        assert_eq!(q, RefundQuote { amount: 0, percentage: 0 });

        let q = refund_for(60000, start(), anchor_millis() + MILLIS_PER_HOUR, Berlin);
        assert_eq!(q.percentage, 0);
    }

    #[test]
    fn percentage_is_monotonic_in_time_to_start() {
        let mut last = 100;
        for hours_before in (-48..=48).rev() {
            let now = anchor_millis() - hours_before * MILLIS_PER_HOUR;
            let pct = refund_for(60000, start(), now, Berlin).percentage;
            assert!(pct <= last, "refund must not increase as start approaches");
            last = pct;
        }
    }
}
