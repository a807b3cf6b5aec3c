//! 通知模块 - 窄接口
//!
//! 通知传输 (邮件/推送/SMS) 由外部协作方负责；这里只定义接口和一个
//! tracing 落地实现。派发永远是 fire-and-forget：失败记日志，绝不阻塞
//! 调用方的成功响应。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// 通知事件
#[derive(Debug, Clone)]
pub enum Notification {
    BookingConfirmedRenter { booking_id: String },
    BookingConfirmedOwner { booking_id: String },
    BookingCancelled { booking_id: String, refund_minor: i64 },
    BookingConflictRefunded { booking_id: String },
}

impl Notification {
    fn describe(&self) -> String {
        match self {
            Notification::BookingConfirmedRenter { booking_id } => {
                format!("Your booking {} is confirmed", booking_id)
            }
            Notification::BookingConfirmedOwner { booking_id } => {
                format!("Your desk was booked ({})", booking_id)
            }
            Notification::BookingCancelled { booking_id, refund_minor } => {
                format!("Booking {} cancelled, refund {} minor units", booking_id, refund_minor)
            }
            Notification::BookingConflictRefunded { booking_id } => {
                format!("Booking {} could not be fulfilled and was refunded", booking_id)
            }
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: &str, notification: Notification) -> Result<(), NotifyError>;
}

/// 默认实现：记录到 tracing (传输层外置)
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, user_id: &str, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            target: "notify",
            user_id = %user_id,
            message = %notification.describe(),
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch: spawn, log failures, never propagate them.
pub fn dispatch(notifier: Arc<dyn Notifier>, user_id: String, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&user_id, notification.clone()).await {
            tracing::warn!(
                target: "notify",
                user_id = %user_id,
                error = %e,
                ?notification,
                "Notification delivery failed"
            );
        }
    });
}
