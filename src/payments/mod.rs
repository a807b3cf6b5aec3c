//! 支付网关模块
//!
//! 外部支付网关是一个窄接口协作方：创建结账会话、发起退款。
//! [`PaymentGateway`] trait 由显式注入的 [`HttpPaymentGateway`] 实现，
//! 测试注入假网关，无进程级单例。

pub mod webhook;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::core::GatewayConfig;
use crate::db::models::Booking;
use crate::utils::AppError;

pub use webhook::{verify_signature, GatewayEvent, WebhookError};

/// 网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Gateway rejected request: {0}")]
    Rejected(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::PaymentGateway(err.to_string())
    }
}

/// 结账会话: 创建预订后重定向租户到 `redirect_url` 完成支付
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// 支付网关窄接口
///
/// 结果通过 webhook 异步送达 (payment-completed / payment-expired)，
/// 本接口只覆盖同步出站调用。
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 为 PENDING 预订创建结账会话
    async fn create_checkout(&self, booking: &Booking) -> Result<CheckoutSession, GatewayError>;

    /// 按金额退款 (minor units)
    ///
    /// `reference` 是幂等键 (booking id)：同一键的重试由网关去重，
    /// 重投递/重试永不重复打款。
    async fn refund(
        &self,
        payment_ref: &str,
        amount: i64,
        reference: &str,
    ) -> Result<(), GatewayError>;
}

/// reqwest 实现
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout(&self, booking: &Booking) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "reference": booking.id,
                "amount": booking.subtotal,
                "currency": booking.currency,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Rejected(format!(
                "checkout returned {}",
                resp.status()
            )));
        }

        resp.json::<CheckoutSession>()
            .await
            .map_err(|e| GatewayError::Rejected(format!("malformed checkout response: {e}")))
    }

    async fn refund(
        &self,
        payment_ref: &str,
        amount: i64,
        reference: &str,
    ) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/refunds", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("idempotency-key", reference)
            .json(&serde_json::json!({
                "payment_ref": payment_ref,
                "amount": amount,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Rejected(format!(
                "refund returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
