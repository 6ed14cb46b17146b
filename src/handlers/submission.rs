// src/handlers/submission.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Map, Value};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        decode, decode_all, encode,
        submission::{
            CreateSubmissionRequest, GradeSubmissionRequest, NewSubmission, Submission,
            SubmissionQuery,
        },
    },
    store::{Collection, ListQuery, RecordStore},
    utils::{html::clean_optional, jwt::Claims},
};

/// Stores a submission; the task must exist.
pub async fn store_submission(
    store: &dyn RecordStore,
    submission: &NewSubmission,
) -> Result<Submission, AppError> {
    store.get(Collection::Tasks, &submission.task).await?;

    let record = store
        .create(Collection::Submissions, encode(submission)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store submission for task {}: {:?}", submission.task, e);
            e
        })?;

    decode(record)
}

/// Records the caller's answer to a task.
pub async fn create_submission(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = NewSubmission {
        user: claims.user_id().to_string(),
        task: payload.task,
        content: payload.content,
        files: payload.files,
        time_spent: payload.time_spent,
        completed: payload.completed,
    };

    let stored = store_submission(store.as_ref(), &submission).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// The caller's submission for a task.
pub async fn get_submission(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SubmissionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::new()
        .filter("user", claims.user_id())
        .filter("task", params.task)
        .sort("created");

    let submissions: Vec<Submission> =
        decode_all(store.list(Collection::Submissions, &query).await?)?;

    let submission = submissions
        .into_iter()
        .next()
        .ok_or_else(|| Collection::Submissions.not_found())?;

    Ok(Json(submission))
}

/// Patches score and/or feedback, the only mutation a submission allows.
/// Trainers and admins only.
pub async fn grade_submission(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
    Json(payload): Json<GradeSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut patch = Map::new();
    if let Some(score) = payload.score {
        patch.insert("score".to_string(), Value::from(score));
    }
    if let Some(feedback) = clean_optional(payload.feedback) {
        patch.insert("feedback".to_string(), Value::String(feedback));
    }
    if patch.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let record = store.update(Collection::Submissions, &id, patch).await?;
    let submission: Submission = decode(record)?;

    Ok(Json(submission))
}
