//! Domain row types shared across crates

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// An account. The identifier is immutable after registration; email is
/// unique and stored case-sensitively.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// One profile per user, upserted from the profile endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub institution: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub updated_at: OffsetDateTime,
}

impl UserProfile {
    /// Display name as shown in the dashboard header
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// The per-user consumable balance. `remaining` never goes negative.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TokenBalance {
    pub user_id: Uuid,
    pub remaining: i32,
    pub updated_at: OffsetDateTime,
}

/// One row of the append-only subscription history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_code: String,
    pub expires_at: OffsetDateTime,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl Subscription {
    /// Whether this row counts as current: active flag set and not expired.
    pub fn is_current(&self, now: OffsetDateTime) -> bool {
        self.is_active && self.expires_at > now
    }
}
