//! Database models

mod availability;
mod booking;
mod desk;
mod payout;

pub use availability::{BlockReason, BlockedDate};
pub use booking::{Booking, BookingStatus};
pub use desk::{Desk, DeskCreate};
pub use payout::{Payout, PayoutStatus};
