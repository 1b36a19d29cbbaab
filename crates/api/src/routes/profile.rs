//! User profile routes

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Deserialize;

use scripta_shared::UserProfile;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_FIELD_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("institution", &self.institution),
            ("address", &self.address),
            ("city", &self.city),
            ("province", &self.province),
        ];
        for (name, value) in fields {
            if value.len() > MAX_FIELD_LEN {
                return Err(ApiError::Validation(format!(
                    "{} must be at most {} characters",
                    name, MAX_FIELD_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Fetch the caller's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UserProfile>> {
    let profile: Option<UserProfile> = sqlx::query_as(
        r#"
        SELECT id, user_id, first_name, last_name, phone, institution,
               address, city, province, updated_at
        FROM user_profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    profile.map(Json).ok_or(ApiError::NotFound)
}

/// Create or replace the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    req.validate()?;

    let profile: UserProfile = sqlx::query_as(
        r#"
        INSERT INTO user_profiles (
            user_id, first_name, last_name, phone, institution,
            address, city, province
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            phone = EXCLUDED.phone,
            institution = EXCLUDED.institution,
            address = EXCLUDED.address,
            city = EXCLUDED.city,
            province = EXCLUDED.province,
            updated_at = NOW()
        RETURNING id, user_id, first_name, last_name, phone, institution,
                  address, city, province, updated_at
        "#,
    )
    .bind(user.id)
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(req.phone.trim())
    .bind(req.institution.trim())
    .bind(req.address.trim())
    .bind(req.city.trim())
    .bind(req.province.trim())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(profile))
}
