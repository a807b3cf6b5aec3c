//! Booking Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Booking lifecycle states
///
/// Transitions are monotonic: PENDING→CONFIRMED, PENDING→deleted (expiry),
/// CONFIRMED→CANCELLED, CONFIRMED→REFUNDED. Nothing ever returns to PENDING
/// and terminal states never go back to CONFIRMED. All writes are
/// status-guarded (`UPDATE ... WHERE status = ?`), never blind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    /// Cancelled with zero refund
    Cancelled,
    /// Cancelled with money returned to the renter
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }
}

/// Booking entity
///
/// `dates` is the ordered set of booked calendar days, stored as a JSON
/// array of `YYYY-MM-DD` strings alongside the normalized availability rows.
/// Money fields are integer minor units and always satisfy
/// `owner_amount + platform_fee == subtotal`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: String,
    pub desk_id: String,
    pub renter_id: String,
    pub dates: Json<Vec<NaiveDate>>,
    pub status: BookingStatus,
    pub subtotal: i64,
    pub platform_fee: i64,
    pub owner_amount: i64,
    pub currency: String,
    /// External payment reference, set on confirmation
    pub payment_ref: Option<String>,
    pub created_at: i64,
}

impl Booking {
    /// Earliest booked date, the rental start and policy anchor
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.dates.iter().min().copied()
    }

    /// Latest booked date, the rental end and payout anchor
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }
}
