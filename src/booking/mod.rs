//! 预订域模块
//!
//! # 组成
//!
//! - [`pricing`] - 价格拆分 (纯函数, 整数 minor units)
//! - [`service`] - 预订编排与取消 (BookingService)
//! - [`reconcile`] - 支付事件对账 (幂等状态机)
//! - [`policy`] - 取消退款政策 (时间分段)
//! - [`payout`] - 打款排期与争议窗口 (纯函数)

pub mod payout;
pub mod policy;
pub mod pricing;
pub mod reconcile;
pub mod service;

pub use pricing::{quote, PriceBreakdown};
pub use reconcile::PaymentReconciler;
pub use service::BookingService;

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared fakes and fixtures for booking-domain tests

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use sqlx::SqlitePool;

    use crate::db::models::Booking;
    use crate::notify::{Notification, Notifier, NotifyError};
    use crate::payments::{CheckoutSession, GatewayError, PaymentGateway};

    /// In-memory gateway double: records refunds with their idempotency
    /// references, can be told to fail.
    #[derive(Default)]
    pub struct FakeGateway {
        fail_checkout: AtomicBool,
        fail_refund: AtomicBool,
        refunds: Mutex<Vec<(String, i64, String)>>,
    }

    impl FakeGateway {
        pub fn fail_checkout(&self) {
            self.fail_checkout.store(true, Ordering::SeqCst);
        }

        pub fn fail_refund(&self) {
            self.fail_refund.store(true, Ordering::SeqCst);
        }

        /// Recorded refunds as (payment_ref, amount, idempotency reference)
        pub fn refunds(&self) -> Vec<(String, i64, String)> {
            self.refunds.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout(
            &self,
            booking: &Booking,
        ) -> Result<CheckoutSession, GatewayError> {
            if self.fail_checkout.load(Ordering::SeqCst) {
                return Err(GatewayError::Unreachable("fake outage".into()));
            }
            Ok(CheckoutSession {
                session_id: format!("cs_{}", booking.id),
                redirect_url: format!("https://pay.example/checkout/cs_{}", booking.id),
            })
        }

        async fn refund(
            &self,
            payment_ref: &str,
            amount: i64,
            reference: &str,
        ) -> Result<(), GatewayError> {
            if self.fail_refund.load(Ordering::SeqCst) {
                return Err(GatewayError::Rejected("fake refund failure".into()));
            }
            self.refunds
                .lock()
                .unwrap()
                .push((payment_ref.to_string(), amount, reference.to_string()));
            Ok(())
        }
    }

    /// Counts deliveries
    #[derive(Default)]
    pub struct FakeNotifier {
        sent: AtomicUsize,
    }

    impl FakeNotifier {
        pub fn count(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send(&self, _user_id: &str, _n: Notification) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub async fn seed_desk(pool: &SqlitePool, id: &str, owner_id: &str, price_per_day: i64) {
        sqlx::query(
            "INSERT INTO desk (id, owner_id, name, price_per_day, currency, is_active, created_at) \
             VALUES (?, ?, 'Test desk', ?, 'EUR', 1, 0)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(price_per_day)
        .execute(pool)
        .await
        .unwrap();
    }

    pub async fn open_dates(pool: &SqlitePool, desk_id: &str, dates: &[&str]) {
        let parsed: Vec<chrono::NaiveDate> = dates.iter().map(|s| s.parse().unwrap()).collect();
        crate::db::repository::availability::open(pool, desk_id, &parsed)
            .await
            .unwrap();
    }
}
