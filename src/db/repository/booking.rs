//! Booking Repository
//!
//! Status mutations are conditional (`WHERE status = ?`) so concurrent
//! reconciliation and cancellation can never clobber each other; callers
//! inspect the affected-row count to detect a lost guard.

use sqlx::{SqliteConnection, SqlitePool};

use super::RepoResult;
use crate::db::models::{Booking, BookingStatus};

const SELECT_COLS: &str = "id, desk_id, renter_id, dates, status, subtotal, platform_fee, \
                           owner_amount, currency, payment_ref, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Booking>> {
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {SELECT_COLS} FROM booking WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(booking)
}

pub async fn find_by_renter(pool: &SqlitePool, renter_id: &str) -> RepoResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {SELECT_COLS} FROM booking WHERE renter_id = ? ORDER BY created_at DESC"
    ))
    .bind(renter_id)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

pub async fn create(pool: &SqlitePool, booking: &Booking) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO booking (id, desk_id, renter_id, dates, status, subtotal, platform_fee, \
         owner_amount, currency, payment_ref, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&booking.id)
    .bind(&booking.desk_id)
    .bind(&booking.renter_id)
    .bind(&booking.dates)
    .bind(booking.status)
    .bind(booking.subtotal)
    .bind(booking.platform_fee)
    .bind(booking.owner_amount)
    .bind(&booking.currency)
    .bind(&booking.payment_ref)
    .bind(booking.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// PENDING → CONFIRMED with the external payment reference, inside the
/// caller's transaction. Returns affected rows: 0 means the booking was not
/// PENDING (replay or concurrent transition) and nothing changed.
pub async fn confirm_in_tx(
    conn: &mut SqliteConnection,
    id: &str,
    payment_ref: &str,
) -> RepoResult<u64> {
    let affected = sqlx::query(
        "UPDATE booking SET status = 'CONFIRMED', payment_ref = ? \
         WHERE id = ? AND status = 'PENDING'",
    )
    .bind(payment_ref)
    .bind(id)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(affected)
}

/// Guarded transition between two statuses. Returns affected rows.
pub async fn transition(
    pool: &SqlitePool,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> RepoResult<u64> {
    let affected = sqlx::query("UPDATE booking SET status = ? WHERE id = ? AND status = ?")
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected)
}

/// [`transition`] on the caller's connection. Cancellation claims the
/// booking with this guard and commits it together with the inventory
/// release; zero affected rows means another caller holds the booking.
pub async fn transition_in_tx(
    conn: &mut SqliteConnection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> RepoResult<u64> {
    let affected = sqlx::query("UPDATE booking SET status = ? WHERE id = ? AND status = ?")
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?
        .rows_affected();
    Ok(affected)
}

/// Remove an expired soft hold. Guarded on PENDING so a confirmed booking
/// can never be deleted by a late Expired event.
pub async fn delete_if_pending(pool: &SqlitePool, id: &str) -> RepoResult<u64> {
    let affected = sqlx::query("DELETE FROM booking WHERE id = ? AND status = 'PENDING'")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected)
}
