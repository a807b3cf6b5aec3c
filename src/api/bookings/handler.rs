//! Booking API Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::booking::payout;
use crate::booking::service::CancellationOutcome;
use crate::core::ServerState;
use crate::db::models::{Booking, BookingStatus, Payout};
use crate::db::repository::booking as booking_repo;
use crate::utils::time::parse_date;
use crate::utils::{now_millis, AppError, AppResult};

/// Create booking payload
#[derive(Debug, Deserialize)]
pub struct BookingCreate {
    pub desk_id: String,
    /// ISO date strings, deduplicated server-side
    pub dates: Vec<String>,
}

/// Create booking response: the soft hold plus the payment redirect
#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub booking_id: String,
    pub redirect_url: String,
    pub booking: Booking,
}

/// POST /api/bookings - 创建预订 (PENDING 软占位)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<BookingCreate>,
) -> AppResult<Json<BookingCreated>> {
    let dates: Vec<NaiveDate> = payload
        .dates
        .iter()
        .map(|s| parse_date(s))
        .collect::<AppResult<_>>()?;

    let created = state
        .booking_service()
        .create_booking(&payload.desk_id, &user.id, dates)
        .await?;

    Ok(Json(BookingCreated {
        booking_id: created.booking.id.clone(),
        redirect_url: created.redirect_url,
        booking: created.booking,
    }))
}

/// GET /api/bookings - 当前用户的预订
pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings = booking_repo::find_by_renter(&state.db, &user.id).await?;
    Ok(Json(bookings))
}

/// GET /api/bookings/:id - 查询预订 (仅租户或业主)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    let (booking, desk) = state.booking_service().booking_with_desk(&id).await?;
    if booking.renter_id != user.id && desk.owner_id != user.id {
        return Err(AppError::forbidden("Not a party to this booking"));
    }
    Ok(Json(booking))
}

/// Cancel response
#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub booking_id: String,
    pub status: BookingStatus,
    pub refund_amount: i64,
    pub refund_percentage: u8,
}

/// POST /api/bookings/:id/cancel - 取消已确认预订
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<CancelResult>> {
    let CancellationOutcome { refund, status } =
        state.booking_service().cancel_booking(&id, &user.id).await?;

    Ok(Json(CancelResult {
        booking_id: id,
        status,
        refund_amount: refund.amount,
        refund_percentage: refund.percentage,
    }))
}

/// Payout schedule view
#[derive(Debug, Serialize)]
pub struct PayoutSchedule {
    #[serde(flatten)]
    pub payout: Payout,
    pub dispute_open: bool,
}

/// GET /api/bookings/:id/payout-schedule - 打款排期 (仅业主)
pub async fn payout_schedule(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<PayoutSchedule>> {
    let (booking, desk) = state.booking_service().booking_with_desk(&id).await?;
    if desk.owner_id != user.id {
        return Err(AppError::forbidden("Only the desk owner can view payouts"));
    }
    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::business_rule(format!(
            "No payout for a {} booking",
            booking.status.as_str()
        )));
    }

    let tz = state.config.business_timezone;
    let payout = payout::payout_for(&booking, &desk, tz)
        .ok_or_else(|| AppError::internal("Confirmed booking has no dates"))?;
    let end_date = booking
        .end_date()
        .ok_or_else(|| AppError::internal("Confirmed booking has no dates"))?;

    Ok(Json(PayoutSchedule {
        dispute_open: payout::can_file_dispute(end_date, now_millis(), tz),
        payout,
    }))
}
