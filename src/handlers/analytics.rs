// src/handlers/analytics.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::DASHBOARD_RECENT_SCENARIOS,
    error::AppError,
    models::{
        analytics::{Analytics, CreateAnalyticsRequest, DashboardSummary, NewAnalytics, average_score},
        decode, decode_all, encode,
        scenario::Scenario,
    },
    store::{Collection, ListQuery, RecordStore},
    utils::{format::format_duration, jwt::Claims},
};

pub async fn store_analytics(
    store: &dyn RecordStore,
    analytics: &NewAnalytics,
) -> Result<Analytics, AppError> {
    let record = store
        .create(Collection::Analytics, encode(analytics)?)
        .await
        .map_err(|e| {
            tracing::error!("Error saving analytics: {:?}", e);
            e
        })?;
    decode(record)
}

async fn user_analytics(store: &dyn RecordStore, user_id: &str) -> Result<Vec<Analytics>, AppError> {
    let query = ListQuery::new().filter("user", user_id).sort("created");
    decode_all(store.list(Collection::Analytics, &query).await?)
}

/// Stores an analytics record for the caller.
pub async fn create_analytics(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAnalyticsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    store.get(Collection::Scenarios, &payload.scenario).await?;

    let analytics = NewAnalytics {
        user: claims.user_id().to_string(),
        scenario: payload.scenario,
        metrics: payload.metrics,
        session_recording: payload.session_recording,
        total_score: payload.total_score,
        completion_time: payload.completion_time,
        completed_at: payload.completed_at.unwrap_or_else(Utc::now),
    };

    let stored = store_analytics(store.as_ref(), &analytics).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// All analytics records of the caller.
pub async fn list_analytics(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(user_analytics(store.as_ref(), claims.user_id()).await?))
}

/// The caller's first analytics record for a scenario.
pub async fn get_scenario_analytics(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Path(scenario_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::new()
        .filter("user", claims.user_id())
        .filter("scenario", scenario_id)
        .sort("created");

    let analytics: Vec<Analytics> = decode_all(store.list(Collection::Analytics, &query).await?)?;
    let first = analytics
        .into_iter()
        .next()
        .ok_or_else(|| Collection::Analytics.not_found())?;

    Ok(Json(first))
}

/// Completed attempts, average score and total time for the caller,
/// plus the first few active scenarios.
pub async fn dashboard(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scenarios: Vec<Scenario> = decode_all(
        store
            .list(
                Collection::Scenarios,
                &ListQuery::new().filter("is_active", true).sort("created"),
            )
            .await?,
    )?;

    let analytics = user_analytics(store.as_ref(), claims.user_id()).await.map_err(|e| {
        tracing::error!("Error fetching dashboard data: {:?}", e);
        e
    })?;

    let total_time: i64 = analytics.iter().map(|a| a.completion_time).sum();

    Ok(Json(DashboardSummary {
        completed_scenarios: analytics.len(),
        average_score: average_score(&analytics),
        total_time,
        total_time_display: format_duration(total_time),
        recent_scenarios: scenarios.into_iter().take(DASHBOARD_RECENT_SCENARIOS).collect(),
        analytics,
    }))
}
