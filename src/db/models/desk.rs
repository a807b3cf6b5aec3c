//! Desk Model

use serde::{Deserialize, Serialize};

/// Desk entity (桌位)
///
/// `price_per_day` is in minor currency units (cents). The owner is a
/// foreign-key reference into the external identity service, never an
/// embedded object.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Desk {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Price per day in minor currency units
    pub price_per_day: i64,
    pub currency: String,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create desk payload
#[derive(Debug, Clone, Deserialize)]
pub struct DeskCreate {
    pub name: String,
    pub price_per_day: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}
