//! Availability Models
//!
//! A desk owns two disjoint date pools: `available_date` (open for booking)
//! and `blocked_date` (booked or owner-revoked). A date is never in both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a date is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    /// Reserved by a confirmed booking
    Booked,
    /// Withdrawn by the desk owner
    OwnerBlocked,
}

/// A blocked calendar day
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlockedDate {
    pub desk_id: String,
    pub date: NaiveDate,
    pub reason: BlockReason,
}
