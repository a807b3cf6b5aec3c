//! Desk API Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{BlockedDate, Desk, DeskCreate};
use crate::db::repository::{availability, desk as desk_repo};
use crate::utils::time::parse_date;
use crate::utils::{AppError, AppResult};

/// GET /api/desks - 获取所有桌位
pub async fn list(
    State(state): State<ServerState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Desk>>> {
    let desks = desk_repo::find_all(&state.db).await?;
    Ok(Json(desks))
}

/// GET /api/desks/:id - 获取单个桌位
pub async fn get_by_id(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Desk>> {
    let desk = desk_repo::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Desk {} not found", id)))?;
    Ok(Json(desk))
}

/// POST /api/desks - 创建桌位 (当前用户为业主)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<DeskCreate>,
) -> AppResult<Json<Desk>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Desk name must not be empty"));
    }
    if payload.price_per_day <= 0 {
        return Err(AppError::validation("Price per day must be positive"));
    }

    let desk = desk_repo::create(&state.db, &user.id, payload).await?;
    Ok(Json(desk))
}

/// 可用日期日历视图
#[derive(Debug, Serialize)]
pub struct CalendarView {
    pub desk_id: String,
    pub available: Vec<NaiveDate>,
    pub blocked: Vec<BlockedDate>,
}

/// GET /api/desks/:id/availability - 日历 (可用 + 锁定日期)
pub async fn availability(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<CalendarView>> {
    // 404 before an empty calendar for an unknown desk
    desk_repo::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Desk {} not found", id)))?;

    let (available, blocked) = availability::calendar(&state.db, &id).await?;
    Ok(Json(CalendarView {
        desk_id: id,
        available,
        blocked,
    }))
}

/// 业主日历变更：开放、撤回、恢复
#[derive(Debug, Deserialize, Default)]
pub struct AvailabilityUpdate {
    #[serde(default)]
    pub open: Vec<String>,
    #[serde(default)]
    pub block: Vec<String>,
    #[serde(default)]
    pub unblock: Vec<String>,
}

/// PUT /api/desks/:id/availability - 业主维护日历
pub async fn update_availability(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AvailabilityUpdate>,
) -> AppResult<Json<CalendarView>> {
    let desk = desk_repo::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Desk {} not found", id)))?;
    if desk.owner_id != user.id {
        return Err(AppError::forbidden("Only the desk owner can edit availability"));
    }

    let open = parse_dates(&payload.open)?;
    let block = parse_dates(&payload.block)?;
    let unblock = parse_dates(&payload.unblock)?;

    // One transaction: a conflicting subset rolls back the whole edit
    availability::update_calendar(&state.db, &id, &open, &block, &unblock).await?;

    let (available, blocked) = availability::calendar(&state.db, &id).await?;
    Ok(Json(CalendarView {
        desk_id: id,
        available,
        blocked,
    }))
}

fn parse_dates(raw: &[String]) -> AppResult<Vec<NaiveDate>> {
    raw.iter().map(|s| parse_date(s)).collect()
}
