// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        decode, decode_all, encode,
        user::{LoginRequest, NewUser, RegisterRequest, Role, User},
    },
    store::{Collection, ListQuery, RecordStore},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Looks a user up by (normalized) email.
pub async fn find_user_by_email(
    store: &dyn RecordStore,
    email: &str,
) -> Result<Option<User>, AppError> {
    let records = store
        .list(
            Collection::Users,
            &ListQuery::new().filter("email", normalize_email(email)),
        )
        .await?;

    Ok(decode_all::<User>(records)?.into_iter().next())
}

/// Stores a new user after checking the email is free.
pub async fn create_user(
    store: &dyn RecordStore,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
    organization: &str,
) -> Result<User, AppError> {
    if find_user_by_email(store, email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let new_user = NewUser {
        email: normalize_email(email),
        name: name.trim().to_string(),
        role,
        organization: organization.to_string(),
        password_hash: hash_password(password)?,
    };

    // The store's unique email constraint settles concurrent registrations
    let record = store.create(Collection::Users, encode(&new_user)?).await.map_err(|e| {
        if !matches!(e, AppError::Conflict(_)) {
            tracing::error!("Failed to register user: {:?}", e);
        }
        e
    })?;

    decode(record)
}

/// Registers a new trainee.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding the hash).
pub async fn register(
    State(store): State<Arc<dyn RecordStore>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.password != payload.password_confirm {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    let user = create_user(
        store.as_ref(),
        &payload.email,
        &payload.password,
        &payload.name,
        Role::Trainee,
        "SimulEx",
    )
    .await?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token with the user record.
///
/// Unknown email and wrong password produce the same 401 so the endpoint
/// does not reveal which accounts exist.
pub async fn login(
    State(store): State<Arc<dyn RecordStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let user = find_user_by_email(store.as_ref(), &payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = sign_jwt(&user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "record": user,
    })))
}

/// Returns the authenticated user's record.
pub async fn me(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let record = store.get(Collection::Users, claims.user_id()).await?;
    let user: User = decode(record)?;
    Ok(Json(user))
}
