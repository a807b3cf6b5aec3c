//! Booking orchestration: creation and cancellation
//!
//! Creation persists a PENDING soft hold with no inventory effect;
//! reservation happens only on confirmed payment (see
//! [`crate::booking::reconcile`]). The gap between the availability check
//! here and the eventual reservation is a documented race; `reserve` is the
//! arbiter and the loser is compensated with a refund.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::booking::policy::{self, RefundQuote};
use crate::booking::pricing;
use crate::db::models::{Booking, BookingStatus, Desk};
use crate::db::repository::{availability, booking as booking_repo, desk as desk_repo};
use crate::notify::{dispatch, Notification, Notifier};
use crate::payments::PaymentGateway;
use crate::utils::{new_id, now_millis, AppError, AppResult};

/// Result of a successful creation: the soft hold plus the redirect the
/// renter follows to the external payment page.
#[derive(Debug)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub redirect_url: String,
}

/// Result of a cancellation
#[derive(Debug, Clone, Copy)]
pub struct CancellationOutcome {
    pub refund: RefundQuote,
    pub status: BookingStatus,
}

/// Booking orchestration service. All collaborators are injected at
/// construction so tests can swap in fakes.
pub struct BookingService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    tz: Tz,
}

impl BookingService {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        tz: Tz,
    ) -> Self {
        Self {
            pool,
            gateway,
            notifier,
            tz,
        }
    }

    /// Create a PENDING booking for `renter_id`.
    ///
    /// Validates the renter against the desk owner, the date set against
    /// the available pool (returning the exact offending subset on
    /// failure), prices the rental and opens a checkout session. No
    /// inventory is reserved here.
    pub async fn create_booking(
        &self,
        desk_id: &str,
        renter_id: &str,
        dates: Vec<NaiveDate>,
    ) -> AppResult<CreatedBooking> {
        // Dedupe + order the requested days
        let dates: Vec<NaiveDate> = dates.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if dates.is_empty() {
            return Err(AppError::validation("At least one date must be selected"));
        }

        let desk = desk_repo::find_by_id(&self.pool, desk_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Desk {}", desk_id)))?;

        if desk.owner_id == renter_id {
            return Err(AppError::SelfBooking);
        }

        let unavailable = availability::unavailable_subset(&self.pool, desk_id, &dates).await?;
        if !unavailable.is_empty() {
            return Err(AppError::UnavailableDates(unavailable));
        }

        let breakdown = pricing::quote(desk.price_per_day, dates.len() as u32)?;

        let booking = Booking {
            id: new_id(),
            desk_id: desk.id.clone(),
            renter_id: renter_id.to_string(),
            dates: Json(dates),
            status: BookingStatus::Pending,
            subtotal: breakdown.subtotal,
            platform_fee: breakdown.platform_fee,
            owner_amount: breakdown.owner_amount,
            currency: desk.currency.clone(),
            payment_ref: None,
            created_at: now_millis(),
        };
        booking_repo::create(&self.pool, &booking).await?;

        let session = match self.gateway.create_checkout(&booking).await {
            Ok(session) => session,
            Err(e) => {
                // No payment session, no soft hold: remove the row again
                booking_repo::delete_if_pending(&self.pool, &booking.id).await?;
                return Err(e.into());
            }
        };

        tracing::info!(
            booking_id = %booking.id,
            desk_id = %desk.id,
            days = booking.dates.len(),
            subtotal = booking.subtotal,
            "Booking created (pending payment)"
        );

        Ok(CreatedBooking {
            booking,
            redirect_url: session.redirect_url,
        })
    }

    /// Cancel a CONFIRMED booking on behalf of its renter.
    ///
    /// Computes the refund from the policy bands, then claims the booking
    /// with a status-guarded transition (REFUNDED when money moves,
    /// CANCELLED otherwise) and frees the booked dates in the same
    /// transaction. The refund is issued only by the claim holder, so
    /// concurrent cancel requests can never pay out twice.
    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        actor_id: &str,
    ) -> AppResult<CancellationOutcome> {
        let booking = booking_repo::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {}", booking_id)))?;

        if booking.renter_id != actor_id {
            return Err(AppError::forbidden("Only the renter can cancel this booking"));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::business_rule(format!(
                "Booking is {} and cannot be cancelled",
                booking.status.as_str()
            )));
        }

        let start_date = booking
            .start_date()
            .ok_or_else(|| AppError::internal("Confirmed booking has no dates"))?;
        let refund = policy::refund_for(booking.subtotal, start_date, now_millis(), self.tz);

        let target = if refund.amount > 0 {
            BookingStatus::Refunded
        } else {
            BookingStatus::Cancelled
        };

        // Claim the booking and free its dates in one transaction; the
        // status guard admits exactly one canceller, and only the caller
        // holding the claim may move money. A gateway failure drops the
        // transaction, leaving the booking CONFIRMED with its dates still
        // blocked. The idempotency reference covers the remaining window
        // (refund issued, commit lost): a retried refund under the same
        // reference is deduplicated by the gateway.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let affected = booking_repo::transition_in_tx(
            &mut tx,
            booking_id,
            BookingStatus::Confirmed,
            target,
        )
        .await?;
        if affected == 0 {
            return Err(AppError::conflict("Booking was modified concurrently"));
        }
        availability::release_in_tx(&mut tx, &booking.desk_id, &booking.dates).await?;

        if refund.amount > 0 {
            let payment_ref = booking
                .payment_ref
                .as_deref()
                .ok_or_else(|| AppError::internal("Confirmed booking has no payment reference"))?;
            self.gateway
                .refund(payment_ref, refund.amount, &booking.id)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        if let Some(desk) = desk_repo::find_by_id(&self.pool, &booking.desk_id).await? {
            dispatch(
                self.notifier.clone(),
                desk.owner_id,
                Notification::BookingCancelled {
                    booking_id: booking.id.clone(),
                    refund_minor: refund.amount,
                },
            );
        }

        tracing::info!(
            booking_id = %booking.id,
            refund_minor = refund.amount,
            percentage = refund.percentage,
            status = target.as_str(),
            "Booking cancelled"
        );

        Ok(CancellationOutcome {
            refund,
            status: target,
        })
    }

    /// Booking + owning desk, for views that need both
    pub async fn booking_with_desk(&self, booking_id: &str) -> AppResult<(Booking, Desk)> {
        let booking = booking_repo::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {}", booking_id)))?;
        let desk = desk_repo::find_by_id(&self.pool, &booking.desk_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Desk {}", booking.desk_id)))?;
        Ok((booking, desk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::testkit::{seed_desk, open_dates, FakeGateway, FakeNotifier};
    use crate::db::DbService;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn service() -> (BookingService, SqlitePool, Arc<FakeGateway>) {
        let db = DbService::open_in_memory().await.unwrap();
        let gateway = Arc::new(FakeGateway::default());
        let svc = BookingService::new(
            db.pool.clone(),
            gateway.clone(),
            Arc::new(FakeNotifier::default()),
            chrono_tz::Europe::Berlin,
        );
        (svc, db.pool, gateway)
    }

    #[tokio::test]
    async fn create_booking_prices_and_holds() {
        let (svc, pool, _) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        open_dates(&pool, "d1", &["2026-09-01", "2026-09-02", "2026-09-03"]).await;

        let created = svc
            .create_booking("d1", "renter-1", vec![d("2026-09-01"), d("2026-09-02"), d("2026-09-03")])
            .await
            .unwrap();

        assert_eq!(created.booking.status, BookingStatus::Pending);
        assert_eq!(created.booking.subtotal, 60000);
        assert_eq!(created.booking.platform_fee, 9000);
        assert_eq!(created.booking.owner_amount, 51000);
        assert!(!created.redirect_url.is_empty());

        // Soft hold: inventory untouched
        let (available, blocked) = availability::calendar(&pool, "d1").await.unwrap();
        assert_eq!(available.len(), 3);
        assert!(blocked.is_empty());
    }

    #[tokio::test]
    async fn create_booking_reports_offending_dates() {
        let (svc, pool, _) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        open_dates(&pool, "d1", &["2026-09-01"]).await;

        let err = svc
            .create_booking("d1", "renter-1", vec![d("2026-09-01"), d("2026-09-02")])
            .await
            .unwrap_err();

        match err {
            AppError::UnavailableDates(dates) => assert_eq!(dates, vec![d("2026-09-02")]),
            other => panic!("expected UnavailableDates, got {:?}", other),
        }

        // Nothing persisted
        let bookings = booking_repo::find_by_renter(&pool, "renter-1").await.unwrap();
        assert!(bookings.is_empty());
    }

    #[tokio::test]
    async fn create_booking_rejects_owner_as_renter() {
        let (svc, pool, _) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        open_dates(&pool, "d1", &["2026-09-01"]).await;

        let err = svc
            .create_booking("d1", "owner-1", vec![d("2026-09-01")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SelfBooking));
    }

    #[tokio::test]
    async fn create_booking_rejects_empty_selection() {
        let (svc, pool, _) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;

        let err = svc.create_booking("d1", "renter-1", vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_booking_rolls_back_on_gateway_failure() {
        let (svc, pool, gateway) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        open_dates(&pool, "d1", &["2026-09-01"]).await;
        gateway.fail_checkout();

        let err = svc
            .create_booking("d1", "renter-1", vec![d("2026-09-01")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentGateway(_)));

        let bookings = booking_repo::find_by_renter(&pool, "renter-1").await.unwrap();
        assert!(bookings.is_empty(), "failed checkout must not leave a hold");
    }

    #[tokio::test]
    async fn cancel_requires_confirmed_status_and_renter() {
        let (svc, pool, _) = service().await;
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        open_dates(&pool, "d1", &["2026-09-01"]).await;
        let created = svc
            .create_booking("d1", "renter-1", vec![d("2026-09-01")])
            .await
            .unwrap();

        // Still pending
        let err = svc.cancel_booking(&created.booking.id, "renter-1").await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        // Wrong actor
        let err = svc.cancel_booking(&created.booking.id, "someone-else").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Unknown booking
        let err = svc.cancel_booking("nope", "renter-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Confirm a hold the way the reconciler does: status flip and
    /// reservation in one transaction.
    async fn confirm(pool: &SqlitePool, id: &str, desk_id: &str, dates: &[NaiveDate]) {
        let mut tx = pool.begin().await.unwrap();
        booking_repo::confirm_in_tx(&mut tx, id, "pi_42").await.unwrap();
        availability::reserve_in_tx(&mut tx, desk_id, dates).await.unwrap();
        tx.commit().await.unwrap();
    }

    fn dates_a_month_out(count: u64) -> Vec<NaiveDate> {
        let today = chrono::Utc::now().date_naive();
        (30..30 + count).map(|n| today + chrono::Days::new(n)).collect()
    }

    #[tokio::test]
    async fn concurrent_cancellations_refund_once() {
        let (svc, pool, gateway) = service().await;
        let dates = dates_a_month_out(2);
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        availability::open(&pool, "d1", &dates).await.unwrap();
        let id = svc
            .create_booking("d1", "renter-1", dates.clone())
            .await
            .unwrap()
            .booking
            .id;
        confirm(&pool, &id, "d1", &dates).await;

        // Double-click: both requests race for the status guard
        let (a, b) = tokio::join!(
            svc.cancel_booking(&id, "renter-1"),
            svc.cancel_booking(&id, "renter-1"),
        );

        let wins = a.is_ok() as usize + b.is_ok() as usize;
        assert_eq!(wins, 1, "exactly one canceller may claim the booking");
        assert_eq!(gateway.refunds().len(), 1, "the renter is refunded once");
        assert_eq!(gateway.refunds()[0].2, id);

        let booking = booking_repo::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Refunded);
    }

    #[tokio::test]
    async fn refund_failure_rolls_back_cancellation() {
        let (svc, pool, gateway) = service().await;
        let dates = dates_a_month_out(2);
        seed_desk(&pool, "d1", "owner-1", 20000).await;
        availability::open(&pool, "d1", &dates).await.unwrap();
        let id = svc
            .create_booking("d1", "renter-1", dates.clone())
            .await
            .unwrap()
            .booking
            .id;
        confirm(&pool, &id, "d1", &dates).await;

        gateway.fail_refund();
        let err = svc.cancel_booking(&id, "renter-1").await.unwrap_err();
        assert!(matches!(err, AppError::PaymentGateway(_)));
        assert!(gateway.refunds().is_empty());

        // Claim and release roll back together: still CONFIRMED, dates
        // still blocked, so the cancellation can be retried
        let booking = booking_repo::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        let (available, blocked) = availability::calendar(&pool, "d1").await.unwrap();
        assert!(available.is_empty());
        assert_eq!(blocked.len(), 2);

        // A retry reaches the gateway again instead of tripping the guard
        let err = svc.cancel_booking(&id, "renter-1").await.unwrap_err();
        assert!(matches!(err, AppError::PaymentGateway(_)));
    }
}
