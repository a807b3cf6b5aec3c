//! Webhook API 模块
//!
//! 支付网关回调入口。无需 JWT，凭 HMAC 签名验证请求来源。

mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/webhooks", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/payment", post(handler::payment_event))
}
