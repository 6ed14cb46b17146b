// src/handlers/task.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::scenario::load_scenario,
    models::{
        decode, decode_all, encode,
        task::{CreateTaskRequest, NewTask, Task},
    },
    store::{Collection, ListQuery, RecordStore},
    utils::html::clean_html,
};

/// Tasks of a scenario in execution order.
pub async fn load_tasks(store: &dyn RecordStore, scenario_id: &str) -> Result<Vec<Task>, AppError> {
    let records = store
        .list(
            Collection::Tasks,
            &ListQuery::new().filter("scenario", scenario_id).sort("order"),
        )
        .await?;
    decode_all(records)
}

/// Lists the tasks of a scenario sorted by `order`.
pub async fn list_tasks(
    State(store): State<Arc<dyn RecordStore>>,
    Path(scenario_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // 404 for an unknown scenario rather than an empty list
    load_scenario(store.as_ref(), &scenario_id).await?;
    Ok(Json(load_tasks(store.as_ref(), &scenario_id).await?))
}

/// Retrieves a single task by ID.
pub async fn get_task(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let task: Task = decode(store.get(Collection::Tasks, &id).await?)?;
    Ok(Json(task))
}

/// Adds a task to an existing scenario.
/// Trainers and admins only.
pub async fn create_task(
    State(store): State<Arc<dyn RecordStore>>,
    Path(scenario_id): Path<String>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let scenario = load_scenario(store.as_ref(), &scenario_id).await?;

    let new_task = NewTask {
        title: payload.title.trim().to_string(),
        description: clean_html(&payload.description),
        scenario: scenario.id,
        task_type: payload.task_type,
        content: payload.content,
        order: payload.order,
        time_limit: payload.time_limit,
        points: payload.points,
    };

    let record = store.create(Collection::Tasks, encode(&new_task)?).await?;
    let task: Task = decode(record)?;

    Ok((StatusCode::CREATED, Json(task)))
}
