//! Payout schedule and dispute window
//!
//! Pure derivations from the rental end date, anchored at 23:00
//! business-local. Queried by dashboards and batch jobs; no write side
//! effects on booking state.

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::db::models::{Booking, Desk, Payout, PayoutStatus};
use crate::utils::time::date_hms_to_millis;

/// End-of-day anchor on the rental end date, business-local
const END_HOUR: u32 = 23;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// When the owner payout is released: end date 23:00 + 3 days
pub fn payout_at(end_date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(end_date, END_HOUR, 0, 0, tz) + 3 * MILLIS_PER_DAY
}

/// Until when the renter can file a dispute: end date 23:00 + 48 hours
pub fn dispute_deadline(end_date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(end_date, END_HOUR, 0, 0, tz) + 48 * MILLIS_PER_HOUR
}

pub fn can_file_dispute(end_date: NaiveDate, now_millis: i64, tz: Tz) -> bool {
    now_millis <= dispute_deadline(end_date, tz)
}

/// Derive the payout for a confirmed booking.
///
/// Returns `None` when the booking has no dates (cannot happen for
/// persisted bookings, which are validated non-empty).
pub fn payout_for(booking: &Booking, desk: &Desk, tz: Tz) -> Option<Payout> {
    let end_date = booking.end_date()?;
    Some(Payout {
        booking_id: booking.id.clone(),
        owner_id: desk.owner_id.clone(),
        amount: booking.owner_amount,
        currency: booking.currency.clone(),
        status: PayoutStatus::Pending,
        payout_at: payout_at(end_date, tz),
        dispute_deadline: dispute_deadline(end_date, tz),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 12).unwrap()
    }

    #[test]
    fn payout_is_three_days_after_end_anchor() {
        let anchor = date_hms_to_millis(end(), END_HOUR, 0, 0, Berlin);
        assert_eq!(payout_at(end(), Berlin) - anchor, 3 * MILLIS_PER_DAY);
    }

    #[test]
    fn dispute_window_is_48_hours() {
        let anchor = date_hms_to_millis(end(), END_HOUR, 0, 0, Berlin);
        assert_eq!(dispute_deadline(end(), Berlin) - anchor, 48 * MILLIS_PER_HOUR);
    }

    #[test]
    fn dispute_closes_after_deadline() {
        let deadline = dispute_deadline(end(), Berlin);
        assert!(can_file_dispute(end(), deadline, Berlin));
        assert!(can_file_dispute(end(), deadline - 1, Berlin));
        assert!(!can_file_dispute(end(), deadline + 1, Berlin));
    }

    #[test]
    fn payout_precedes_nothing_before_dispute_deadline() {
        // The payout release is strictly after the dispute window closes
        assert!(payout_at(end(), Berlin) > dispute_deadline(end(), Berlin));
    }
}
