//! Desk Repository

use sqlx::SqlitePool;

use super::RepoResult;
use crate::db::models::{Desk, DeskCreate};
use crate::utils::{new_id, now_millis};

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Desk>> {
    let desk = sqlx::query_as::<_, Desk>(
        "SELECT id, owner_id, name, price_per_day, currency, is_active, created_at \
         FROM desk WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(desk)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Desk>> {
    let desks = sqlx::query_as::<_, Desk>(
        "SELECT id, owner_id, name, price_per_day, currency, is_active, created_at \
         FROM desk WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(desks)
}

pub async fn create(pool: &SqlitePool, owner_id: &str, data: DeskCreate) -> RepoResult<Desk> {
    let desk = Desk {
        id: new_id(),
        owner_id: owner_id.to_string(),
        name: data.name,
        price_per_day: data.price_per_day,
        currency: data.currency,
        is_active: true,
        created_at: now_millis(),
    };

    sqlx::query(
        "INSERT INTO desk (id, owner_id, name, price_per_day, currency, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(&desk.id)
    .bind(&desk.owner_id)
    .bind(&desk.name)
    .bind(desk.price_per_day)
    .bind(&desk.currency)
    .bind(desk.created_at)
    .execute(pool)
    .await?;

    Ok(desk)
}
