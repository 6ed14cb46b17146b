// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::{create_user as store_user, find_user_by_email},
    models::user::{AdminCreateUserRequest, Role},
    store::RecordStore,
};

/// Creates a user with a specific role (e.g. a trainer).
/// Admin only.
pub async fn create_user(
    State(store): State<Arc<dyn RecordStore>>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store_user(
        store.as_ref(),
        &payload.email,
        &payload.password,
        &payload.name,
        payload.role,
        payload.organization.as_deref().unwrap_or("SimulEx"),
    )
    .await?;

    tracing::info!("Admin created {} user {}", user.role.as_str(), user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Creates the configured admin account on startup if it does not exist yet.
pub async fn seed_admin_user(store: &dyn RecordStore, config: &Config) -> Result<(), AppError> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if find_user_by_email(store, email).await?.is_none() {
            tracing::info!("Seeding admin user: {}", email);
            store_user(store, email, password, "Administrator", Role::Admin, "SimulEx").await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
