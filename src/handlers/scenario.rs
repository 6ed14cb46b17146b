// src/handlers/scenario.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        decode, decode_all, encode,
        scenario::{CreateScenarioRequest, NewScenario, Scenario, ScenarioListParams},
    },
    store::{Collection, ListQuery, RecordStore},
    utils::{html::clean_html, jwt::Claims},
};

pub async fn load_scenario(store: &dyn RecordStore, id: &str) -> Result<Scenario, AppError> {
    decode(store.get(Collection::Scenarios, id).await?)
}

/// Lists active scenarios in creation order.
///
/// Category and difficulty are pushed down to the store as equality filters;
/// the free-text `q` is matched here against title and description.
pub async fn list_scenarios(
    State(store): State<Arc<dyn RecordStore>>,
    Query(params): Query<ScenarioListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut query = ListQuery::new().filter("is_active", true).sort("created");
    if let Some(category) = params.category {
        query = query.filter("category", category.as_str());
    }
    if let Some(difficulty) = params.difficulty {
        query = query.filter("difficulty", difficulty.as_str());
    }

    let records = store.list(Collection::Scenarios, &query).await.map_err(|e| {
        tracing::error!("Failed to load scenarios: {:?}", e);
        e
    })?;

    let mut scenarios: Vec<Scenario> = decode_all(records)?;
    if let Some(q) = params.q.as_deref() {
        scenarios.retain(|s| s.matches_search(q));
    }

    Ok(Json(scenarios))
}

/// Retrieves a single scenario by ID.
pub async fn get_scenario(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_scenario(store.as_ref(), &id).await?))
}

/// Creates a new scenario authored by the caller.
/// Trainers and admins only.
pub async fn create_scenario(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateScenarioRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let new_scenario = NewScenario {
        title: payload.title.trim().to_string(),
        description: clean_html(&payload.description),
        category: payload.category,
        difficulty: payload.difficulty,
        duration: payload.duration,
        cover_image: payload.cover_image,
        is_active: payload.is_active.unwrap_or(true),
        created_by: claims.user_id().to_string(),
    };

    let record = store
        .create(Collection::Scenarios, encode(&new_scenario)?)
        .await?;
    let scenario: Scenario = decode(record)?;

    tracing::info!("Scenario {} created by {}", scenario.id, scenario.created_by);
    Ok((StatusCode::CREATED, Json(scenario)))
}
