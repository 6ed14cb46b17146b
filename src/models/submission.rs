// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::fields::{empty_as_none, timestamp};

/// Represents a record of the 'submissions' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,

    pub user: String,

    pub task: String,

    /// Free-form answer payload (code, decisions, notes...).
    pub content: Value,

    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    /// Seconds spent on the task.
    pub time_spent: i64,

    pub completed: bool,

    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,
}

/// DTO for recording an answer to a task.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, max = 64))]
    pub task: String,
    #[validate(custom(function = validate_object))]
    pub content: Value,
    #[serde(default)]
    #[validate(custom(function = validate_files))]
    pub files: Vec<String>,
    #[validate(range(min = 0))]
    pub time_spent: i64,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

/// DTO for grading. Only score and feedback can change after submission.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeSubmissionRequest {
    #[validate(range(min = 0.0))]
    pub score: Option<f64>,
    #[validate(length(max = 5000))]
    pub feedback: Option<String>,
}

/// Query parameters for looking up the caller's submission.
#[derive(Debug, Deserialize)]
pub struct SubmissionQuery {
    pub task: String,
}

/// Body written to the store when a submission is created.
#[derive(Debug, Serialize)]
pub struct NewSubmission {
    pub user: String,
    pub task: String,
    pub content: Value,
    pub files: Vec<String>,
    pub time_spent: i64,
    pub completed: bool,
}

pub(crate) fn validate_object(content: &Value) -> Result<(), validator::ValidationError> {
    if content.is_object() {
        Ok(())
    } else {
        Err(validator::ValidationError::new("content_must_be_object"))
    }
}

fn validate_files(files: &[String]) -> Result<(), validator::ValidationError> {
    if files.len() > 20 {
        return Err(validator::ValidationError::new("too_many_files"));
    }
    for name in files {
        if name.is_empty() || name.len() > 255 {
            return Err(validator::ValidationError::new("invalid_file_name"));
        }
    }
    Ok(())
}
