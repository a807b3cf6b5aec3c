//! Availability Store
//!
//! Owns the per-desk available/blocked date pools and the atomic moves
//! between them. Every mutating operation runs in a single transaction so
//! the two pools stay disjoint; the UNIQUE(desk_id, date) index on
//! `blocked_date` turns a concurrent double-reserve into a constraint
//! violation instead of a silent overwrite.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use super::{placeholders, RepoError, RepoResult};
use crate::db::models::{BlockReason, BlockedDate};

/// The subset of `dates` NOT currently in the available pool.
///
/// Empty result means the request is fully available. Read-only: no lock is
/// taken, so availability can change between this check and a later
/// `reserve` (the soft-hold race; `reserve` is the arbiter).
pub async fn unavailable_subset(
    pool: &SqlitePool,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<Vec<NaiveDate>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT date FROM available_date WHERE desk_id = ? AND date IN ({})",
        placeholders(dates.len())
    );
    let mut query = sqlx::query_scalar::<_, NaiveDate>(&sql).bind(desk_id);
    for date in dates {
        query = query.bind(date);
    }
    let available = query.fetch_all(pool).await?;

    Ok(dates
        .iter()
        .filter(|d| !available.contains(d))
        .copied()
        .collect())
}

/// Atomically move `dates` from available to blocked(BOOKED).
///
/// Idempotent against replays: a date already blocked with reason BOOKED is
/// skipped. A date blocked with OWNER_BLOCKED, or present in neither pool,
/// fails the whole transaction with [`RepoError::Conflict`]: the booking
/// cannot be backed by inventory and must not be confirmed.
pub async fn reserve(pool: &SqlitePool, desk_id: &str, dates: &[NaiveDate]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    reserve_in_tx(&mut tx, desk_id, dates).await?;
    tx.commit().await?;
    Ok(())
}

/// Transaction-composable body of [`reserve`].
///
/// The payment reconciler runs this on the same connection as the booking
/// status flip, so neither can land without the other.
pub async fn reserve_in_tx(
    conn: &mut SqliteConnection,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    for date in dates {
        let blocked = sqlx::query_scalar::<_, BlockReason>(
            "SELECT reason FROM blocked_date WHERE desk_id = ? AND date = ?",
        )
        .bind(desk_id)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await?;

        match blocked {
            // Replay of an already-applied reservation
            Some(BlockReason::Booked) => continue,
            Some(BlockReason::OwnerBlocked) => {
                return Err(RepoError::Conflict(format!(
                    "Date {} was withdrawn by the owner",
                    date
                )));
            }
            None => {}
        }

        let deleted = sqlx::query("DELETE FROM available_date WHERE desk_id = ? AND date = ?")
            .bind(desk_id)
            .bind(date)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if deleted == 0 {
            // In neither pool: the owner removed the date entirely
            return Err(RepoError::Conflict(format!(
                "Date {} is no longer available",
                date
            )));
        }

        sqlx::query("INSERT INTO blocked_date (desk_id, date, reason) VALUES (?, ?, 'BOOKED')")
            .bind(desk_id)
            .bind(date)
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                // Unique index hit: a concurrent reservation won the race
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepoError::Conflict(format!("Date {} was reserved concurrently", date))
                }
                other => RepoError::from(other),
            })?;
    }
    Ok(())
}

/// Inverse of [`reserve`]: return blocked(BOOKED) dates to the available
/// pool. OWNER_BLOCKED rows are never touched; only the owner releases
/// those (see [`owner_unblock`]). Dates not blocked as BOOKED are skipped.
pub async fn release(pool: &SqlitePool, desk_id: &str, dates: &[NaiveDate]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    release_in_tx(&mut tx, desk_id, dates).await?;
    tx.commit().await?;
    Ok(())
}

/// Transaction-composable body of [`release`].
///
/// Cancellation commits this with the booking status transition on one
/// connection, so a terminal booking can never leave orphaned BOOKED rows.
pub async fn release_in_tx(
    conn: &mut SqliteConnection,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    for date in dates {
        let deleted = sqlx::query(
            "DELETE FROM blocked_date WHERE desk_id = ? AND date = ? AND reason = 'BOOKED'",
        )
        .bind(desk_id)
        .bind(date)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if deleted > 0 {
            sqlx::query("INSERT OR IGNORE INTO available_date (desk_id, date) VALUES (?, ?)")
                .bind(desk_id)
                .bind(date)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

/// Owner opens dates for booking. Dates currently blocked (either reason)
/// are rejected; already-open dates are ignored.
pub async fn open(pool: &SqlitePool, desk_id: &str, dates: &[NaiveDate]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    open_in_tx(&mut tx, desk_id, dates).await?;
    tx.commit().await?;
    Ok(())
}

async fn open_in_tx(
    conn: &mut SqliteConnection,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    for date in dates {
        let blocked = sqlx::query_scalar::<_, BlockReason>(
            "SELECT reason FROM blocked_date WHERE desk_id = ? AND date = ?",
        )
        .bind(desk_id)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await?;

        if blocked.is_some() {
            return Err(RepoError::Conflict(format!(
                "Date {} is blocked and cannot be opened",
                date
            )));
        }

        sqlx::query("INSERT OR IGNORE INTO available_date (desk_id, date) VALUES (?, ?)")
            .bind(desk_id)
            .bind(date)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Owner withdraws open dates: available → blocked(OWNER_BLOCKED).
///
/// A date that is not currently available (missing or already blocked)
/// fails the transaction; booked dates cannot be withdrawn from under a
/// confirmed booking.
pub async fn owner_block(pool: &SqlitePool, desk_id: &str, dates: &[NaiveDate]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    owner_block_in_tx(&mut tx, desk_id, dates).await?;
    tx.commit().await?;
    Ok(())
}

async fn owner_block_in_tx(
    conn: &mut SqliteConnection,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    for date in dates {
        let deleted = sqlx::query("DELETE FROM available_date WHERE desk_id = ? AND date = ?")
            .bind(desk_id)
            .bind(date)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(RepoError::Conflict(format!(
                "Date {} is not open and cannot be withdrawn",
                date
            )));
        }

        sqlx::query(
            "INSERT INTO blocked_date (desk_id, date, reason) VALUES (?, ?, 'OWNER_BLOCKED')",
        )
        .bind(desk_id)
        .bind(date)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("Date {} was reserved concurrently", date))
            }
            other => RepoError::from(other),
        })?;
    }
    Ok(())
}

/// Owner re-opens withdrawn dates: blocked(OWNER_BLOCKED) → available.
/// BOOKED rows are never touched.
pub async fn owner_unblock(
    pool: &SqlitePool,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    owner_unblock_in_tx(&mut tx, desk_id, dates).await?;
    tx.commit().await?;
    Ok(())
}

async fn owner_unblock_in_tx(
    conn: &mut SqliteConnection,
    desk_id: &str,
    dates: &[NaiveDate],
) -> RepoResult<()> {
    for date in dates {
        let deleted = sqlx::query(
            "DELETE FROM blocked_date WHERE desk_id = ? AND date = ? AND reason = 'OWNER_BLOCKED'",
        )
        .bind(desk_id)
        .bind(date)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if deleted > 0 {
            sqlx::query("INSERT OR IGNORE INTO available_date (desk_id, date) VALUES (?, ?)")
                .bind(desk_id)
                .bind(date)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

/// One owner calendar edit: open, withdraw and re-open date sets in a
/// single transaction. Any Conflict rolls back the whole edit, so a
/// partially applied update can never be reported as an error.
pub async fn update_calendar(
    pool: &SqlitePool,
    desk_id: &str,
    open: &[NaiveDate],
    block: &[NaiveDate],
    unblock: &[NaiveDate],
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    open_in_tx(&mut tx, desk_id, open).await?;
    owner_block_in_tx(&mut tx, desk_id, block).await?;
    owner_unblock_in_tx(&mut tx, desk_id, unblock).await?;
    tx.commit().await?;
    Ok(())
}

/// Full calendar for a desk: open dates and blocked dates with reasons.
pub async fn calendar(
    pool: &SqlitePool,
    desk_id: &str,
) -> RepoResult<(Vec<NaiveDate>, Vec<BlockedDate>)> {
    let available = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT date FROM available_date WHERE desk_id = ? ORDER BY date",
    )
    .bind(desk_id)
    .fetch_all(pool)
    .await?;

    let blocked = sqlx::query_as::<_, BlockedDate>(
        "SELECT desk_id, date, reason FROM blocked_date WHERE desk_id = ? ORDER BY date",
    )
    .bind(desk_id)
    .fetch_all(pool)
    .await?;

    Ok((available, blocked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> SqlitePool {
        let db = DbService::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO desk (id, owner_id, name, price_per_day, currency, is_active, created_at) \
             VALUES ('d1', 'owner-1', 'Window desk', 20000, 'EUR', 1, 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();
        db.pool
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn pools(pool: &SqlitePool) -> (Vec<NaiveDate>, Vec<BlockedDate>) {
        calendar(pool, "d1").await.unwrap()
    }

    #[tokio::test]
    async fn reserve_moves_dates_between_pools() {
        let pool = test_pool().await;
        let dates = [d("2026-09-01"), d("2026-09-02")];
        open(&pool, "d1", &dates).await.unwrap();

        reserve(&pool, "d1", &dates).await.unwrap();

        let (available, blocked) = pools(&pool).await;
        assert!(available.is_empty());
        assert_eq!(blocked.len(), 2);
        assert!(blocked.iter().all(|b| b.reason == BlockReason::Booked));
    }

    #[tokio::test]
    async fn reserve_replay_is_idempotent() {
        let pool = test_pool().await;
        let dates = [d("2026-09-01")];
        open(&pool, "d1", &dates).await.unwrap();

        reserve(&pool, "d1", &dates).await.unwrap();
        reserve(&pool, "d1", &dates).await.unwrap();

        let (available, blocked) = pools(&pool).await;
        assert!(available.is_empty());
        assert_eq!(blocked.len(), 1, "replay must not duplicate blocked rows");
    }

    #[tokio::test]
    async fn reserve_fails_on_owner_blocked_date() {
        let pool = test_pool().await;
        let dates = [d("2026-09-01"), d("2026-09-02")];
        open(&pool, "d1", &dates).await.unwrap();
        owner_block(&pool, "d1", &[d("2026-09-02")]).await.unwrap();

        let err = reserve(&pool, "d1", &dates).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        // Transaction rolled back: the first date stayed available
        let (available, _) = pools(&pool).await;
        assert!(available.contains(&d("2026-09-01")));
    }

    #[tokio::test]
    async fn reserve_fails_on_missing_date() {
        let pool = test_pool().await;
        let err = reserve(&pool, "d1", &[d("2026-09-01")]).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn release_returns_booked_dates_only() {
        let pool = test_pool().await;
        let dates = [d("2026-09-01"), d("2026-09-02")];
        open(&pool, "d1", &dates).await.unwrap();
        reserve(&pool, "d1", &[d("2026-09-01")]).await.unwrap();
        owner_block(&pool, "d1", &[d("2026-09-02")]).await.unwrap();

        release(&pool, "d1", &dates).await.unwrap();

        let (available, blocked) = pools(&pool).await;
        assert_eq!(available, vec![d("2026-09-01")]);
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].reason, BlockReason::OwnerBlocked);
    }

    #[tokio::test]
    async fn pools_stay_disjoint() {
        let pool = test_pool().await;
        let dates = [d("2026-09-01"), d("2026-09-02"), d("2026-09-03")];
        open(&pool, "d1", &dates).await.unwrap();
        reserve(&pool, "d1", &[d("2026-09-01")]).await.unwrap();
        owner_block(&pool, "d1", &[d("2026-09-02")]).await.unwrap();
        release(&pool, "d1", &[d("2026-09-01")]).await.unwrap();

        let (available, blocked) = pools(&pool).await;
        for b in &blocked {
            assert!(!available.contains(&b.date), "date {} in both pools", b.date);
        }
    }

    #[tokio::test]
    async fn unavailable_subset_names_the_offenders() {
        let pool = test_pool().await;
        open(&pool, "d1", &[d("2026-09-01")]).await.unwrap();

        let missing = unavailable_subset(&pool, "d1", &[d("2026-09-01"), d("2026-09-02")])
            .await
            .unwrap();
        assert_eq!(missing, vec![d("2026-09-02")]);
    }

    #[tokio::test]
    async fn owner_cannot_withdraw_booked_date() {
        let pool = test_pool().await;
        open(&pool, "d1", &[d("2026-09-01")]).await.unwrap();
        reserve(&pool, "d1", &[d("2026-09-01")]).await.unwrap();

        let err = owner_block(&pool, "d1", &[d("2026-09-01")]).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn calendar_update_applies_all_or_nothing() {
        let pool = test_pool().await;
        open(&pool, "d1", &[d("2026-09-01")]).await.unwrap();
        reserve(&pool, "d1", &[d("2026-09-01")]).await.unwrap();

        // The open set is fine, but withdrawing a booked date conflicts;
        // the whole edit must roll back.
        let err = update_calendar(
            &pool,
            "d1",
            &[d("2026-09-02"), d("2026-09-03")],
            &[d("2026-09-01")],
            &[],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        let (available, blocked) = pools(&pool).await;
        assert!(available.is_empty(), "failed edit must not open any dates");
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].reason, BlockReason::Booked);
    }
}
