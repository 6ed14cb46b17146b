// src/models/task.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::fields::{timestamp, zero_as_none};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Code,
    Design,
    Decision,
    DataEntry,
    PromptEngineering,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Sandbox settings for terminal-style tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default)]
    pub initial_directory: String,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
}

/// Instructions and scoring material shown for a task.
/// Keys this type does not know about are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    pub instructions: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_template: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub design_assets: Vec<DesignAsset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_config: Option<TerminalConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Represents a record of the 'tasks' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    pub title: String,

    pub description: String,

    /// Id of the parent scenario.
    pub scenario: String,

    /// Mapped from the record field 'type' since `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub content: TaskContent,

    /// Position within the scenario; tasks run in ascending order.
    pub order: i64,

    /// Suggested time limit in seconds.
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i64>,

    pub points: i64,

    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,
}

/// DTO for creating a task inside a scenario.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[validate(custom(function = validate_content))]
    pub content: TaskContent,
    #[validate(range(min = 0))]
    pub order: i64,
    #[validate(range(min = 1, max = 86400))]
    pub time_limit: Option<i64>,
    #[validate(range(min = 0, max = 10000))]
    pub points: i64,
}

fn validate_content(content: &TaskContent) -> Result<(), validator::ValidationError> {
    if content.instructions.trim().is_empty() {
        return Err(validator::ValidationError::new("instructions_cannot_be_empty"));
    }
    for resource in &content.resources {
        if url::Url::parse(&resource.url).is_err() {
            return Err(validator::ValidationError::new("invalid_resource_url"));
        }
    }
    Ok(())
}

/// Body written to the store when a task is created.
#[derive(Debug, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub scenario: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub content: TaskContent,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i64>,
    pub points: i64,
}
