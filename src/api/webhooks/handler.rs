//! Payment Webhook Handler
//!
//! Acknowledge (2xx) once an event is fully applied or is a no-op replay,
//! otherwise return an error status so the gateway redelivers.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::booking::reconcile::ReconcileOutcome;
use crate::core::ServerState;
use crate::payments::webhook::{self, SIGNATURE_HEADER};
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

/// POST /webhooks/payment - 处理支付网关事件
pub async fn payment_event(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let gateway_cfg = &state.config.gateway;
    webhook::verify_signature(
        &body,
        signature,
        &gateway_cfg.webhook_secret,
        gateway_cfg.timestamp_tolerance_secs,
    )?;

    let event = webhook::parse_event(&body)?;
    info!(event = %event.kind(), booking_id = %event.booking_id(), "Webhook event received");

    // Errors (unknown booking, failed compensating refund, database) map
    // to non-2xx so the gateway redelivers the event.
    let outcome = state.reconciler().apply(&event).await?;

    let label = match outcome {
        ReconcileOutcome::Confirmed => "confirmed",
        ReconcileOutcome::AlreadyApplied => "already_applied",
        ReconcileOutcome::Expired => "expired",
        ReconcileOutcome::ConflictRefunded => "conflict_refunded",
    };

    Ok(Json(WebhookAck {
        received: true,
        outcome: label,
    }))
}
