// src/handlers/simulation.rs

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
    error::AppError,
    handlers::{
        analytics::store_analytics, scenario::load_scenario, submission::store_submission,
        task::load_tasks,
    },
    models::simulation::{SimulationStatus, StartSimulationRequest, SubmitTaskRequest},
    simulation::{Advance, Session, SessionRegistry, SimulationRun},
    store::RecordStore,
    utils::jwt::Claims,
};

/// Starts a run of a scenario for the caller.
///
/// Loads the scenario and its ordered tasks, starts the clock and
/// returns the session positioned on the first task.
pub async fn start_simulation(
    State(store): State<Arc<dyn RecordStore>>,
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSimulationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let scenario = load_scenario(store.as_ref(), &payload.scenario).await?;
    if !scenario.is_active {
        return Err(AppError::NotFound("Simulation data not found".to_string()));
    }
    let tasks = load_tasks(store.as_ref(), &scenario.id).await.map_err(|e| {
        tracing::error!("Error fetching simulation data: {:?}", e);
        e
    })?;

    let now = Utc::now();
    let run = SimulationRun::start(scenario, tasks, now)?;
    let handle = sessions.insert(Session::new(claims.user_id(), run, now)).await;
    let session = handle.lock().await;

    tracing::info!(
        "Simulation {} started on scenario {} by {}",
        session.id,
        session.run.scenario().id,
        session.user_id
    );

    Ok((
        StatusCode::CREATED,
        Json(SimulationStatus::from_session(&session, now)),
    ))
}

/// Current position, timer and results of a session.
pub async fn get_simulation(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = sessions.get(&id).await?;
    let mut session = handle.lock().await;
    session.ensure_owner(claims.user_id())?;

    let now = Utc::now();
    session.last_activity = now;

    Ok(Json(SimulationStatus::from_session(&session, now)))
}

/// Records the answer to the current task and advances the run.
///
/// After the last task the analytics record is written. If any store call
/// fails the session stays on the same task.
pub async fn submit_task(
    State(store): State<Arc<dyn RecordStore>>,
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let handle = sessions.get(&id).await?;
    let mut session = handle.lock().await;
    session.ensure_owner(claims.user_id())?;

    let now = Utc::now();
    let submission = session
        .run
        .prepare_submission(claims.user_id(), payload.content, payload.files, now)?;
    let stored = store_submission(store.as_ref(), &submission).await?;

    let mut run = session.run.clone();
    if run.record_submission(stored, now) == Advance::Finished {
        let analytics = store_analytics(store.as_ref(), &run.summarize(claims.user_id(), now)).await?;
        tracing::info!(
            "Simulation {} completed with score {:.2}",
            session.id,
            analytics.total_score
        );
        session.analytics_id = Some(analytics.id);
    }
    session.run = run;
    session.last_activity = now;

    Ok(Json(SimulationStatus::from_session(&session, now)))
}

/// Abandons a session and stops its clock.
pub async fn abandon_simulation(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = sessions.get(&id).await?;
    handle.lock().await.ensure_owner(claims.user_id())?;
    sessions.remove(&id).await;

    Ok(StatusCode::NO_CONTENT)
}
