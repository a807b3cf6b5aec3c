//! Payment event reconciliation
//!
//! Applies gateway events to booking and inventory state. Delivery is
//! at-least-once: idempotence comes from checking current booking status
//! before acting, never from trusting an event to arrive once. The status
//! flip and the inventory move commit in one transaction, so neither can
//! land without the other.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::models::BookingStatus;
use crate::db::repository::{availability, booking as booking_repo, desk as desk_repo, RepoError};
use crate::notify::{dispatch, Notification, Notifier};
use crate::payments::{GatewayEvent, PaymentGateway};
use crate::utils::{AppError, AppResult};

/// What a reconciliation run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Booking confirmed, dates reserved
    Confirmed,
    /// Replay or already-terminal booking: nothing to do
    AlreadyApplied,
    /// Soft hold removed after session expiry
    Expired,
    /// Lost the inventory race; payment refunded, booking cancelled
    ConflictRefunded,
}

pub struct PaymentReconciler {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentReconciler {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            gateway,
            notifier,
        }
    }

    /// Apply one authenticated gateway event.
    ///
    /// An `Err` leaves the booking in its last valid state and tells the
    /// webhook layer to answer non-2xx so the gateway redelivers.
    pub async fn apply(&self, event: &GatewayEvent) -> AppResult<ReconcileOutcome> {
        let outcome = match event {
            GatewayEvent::PaymentCompleted {
                booking_id,
                payment_ref,
            } => self.apply_completed(booking_id, payment_ref).await,
            GatewayEvent::PaymentExpired { booking_id } => self.apply_expired(booking_id).await,
        };

        match &outcome {
            Ok(o) => tracing::info!(
                target: "reconcile",
                booking_id = %event.booking_id(),
                kind = event.kind(),
                outcome = ?o,
                "Gateway event reconciled"
            ),
            Err(e) => tracing::error!(
                target: "reconcile",
                booking_id = %event.booking_id(),
                kind = event.kind(),
                error = %e,
                "Gateway event reconciliation failed"
            ),
        }
        outcome
    }

    async fn apply_completed(
        &self,
        booking_id: &str,
        payment_ref: &str,
    ) -> AppResult<ReconcileOutcome> {
        let booking = booking_repo::find_by_id(&self.pool, booking_id)
            .await?
            // Redelivery covers an event racing ahead of the creation commit
            .ok_or_else(|| AppError::not_found(format!("Booking {}", booking_id)))?;

        match booking.status {
            // Idempotent replay: no inventory move, no notifications
            BookingStatus::Confirmed => return Ok(ReconcileOutcome::AlreadyApplied),
            // Terminal states never return to CONFIRMED
            s if s.is_terminal() => return Ok(ReconcileOutcome::AlreadyApplied),
            BookingStatus::Pending => {}
            _ => unreachable!(),
        }

        // Status flip and inventory move commit together or not at all
        let mut tx = self.pool.begin().await.map_err(|e| AppError::database(e.to_string()))?;

        let affected = booking_repo::confirm_in_tx(&mut tx, booking_id, payment_ref).await?;
        if affected == 0 {
            // A concurrent delivery won the guard between our read and here
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        match availability::reserve_in_tx(&mut tx, &booking.desk_id, &booking.dates).await {
            Ok(()) => {
                tx.commit().await.map_err(|e| AppError::database(e.to_string()))?;
            }
            Err(RepoError::Conflict(reason)) => {
                // The soft hold lost the race (or the owner revoked a date).
                // Never confirm a booking the inventory cannot back: roll
                // back, return the money, close the booking out.
                drop(tx);
                tracing::warn!(
                    target: "reconcile",
                    booking_id = %booking_id,
                    %reason,
                    "Reservation conflict, compensating with refund"
                );

                // Claim the hold before money moves; zero rows means a
                // concurrent delivery already compensated this booking.
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;
                let affected = booking_repo::transition_in_tx(
                    &mut tx,
                    booking_id,
                    BookingStatus::Pending,
                    BookingStatus::Cancelled,
                )
                .await?;
                if affected == 0 {
                    return Ok(ReconcileOutcome::AlreadyApplied);
                }

                // A failed refund drops the transaction: the booking stays
                // PENDING and the gateway redelivers. The idempotency
                // reference keeps a redelivered refund from paying twice.
                self.gateway
                    .refund(payment_ref, booking.subtotal, booking_id)
                    .await?;
                tx.commit()
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;

                dispatch(
                    self.notifier.clone(),
                    booking.renter_id.clone(),
                    Notification::BookingConflictRefunded {
                        booking_id: booking_id.to_string(),
                    },
                );
                return Ok(ReconcileOutcome::ConflictRefunded);
            }
            Err(other) => return Err(other.into()),
        }

        // Post-commit notifications: fire-and-forget, failures logged
        dispatch(
            self.notifier.clone(),
            booking.renter_id.clone(),
            Notification::BookingConfirmedRenter {
                booking_id: booking_id.to_string(),
            },
        );
        if let Some(desk) = desk_repo::find_by_id(&self.pool, &booking.desk_id).await? {
            dispatch(
                self.notifier.clone(),
                desk.owner_id,
                Notification::BookingConfirmedOwner {
                    booking_id: booking_id.to_string(),
                },
            );
        }

        Ok(ReconcileOutcome::Confirmed)
    }

    async fn apply_expired(&self, booking_id: &str) -> AppResult<ReconcileOutcome> {
        // A PENDING booking never reserved inventory, so deletion is the
        // whole cleanup. The guard makes a late Expired after confirmation
        // a no-op rather than a data loss.
        let affected = booking_repo::delete_if_pending(&self.pool, booking_id).await?;
        if affected == 0 {
            return Ok(ReconcileOutcome::AlreadyApplied);
        }
        Ok(ReconcileOutcome::Expired)
    }
}
