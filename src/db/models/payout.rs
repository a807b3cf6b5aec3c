//! Payout Model
//!
//! Payouts are derived from confirmed bookings rather than materialized
//! eagerly: a booking's owner amount becomes payable once the rental end
//! passes the dispute window.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Failed,
}

/// Derived payout for a confirmed booking
#[derive(Debug, Clone, Serialize)]
pub struct Payout {
    pub booking_id: String,
    pub owner_id: String,
    /// Owner amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: PayoutStatus,
    /// When the payout is released (Unix millis)
    pub payout_at: i64,
    /// Until when the renter can file a dispute (Unix millis)
    pub dispute_deadline: i64,
}
