// src/models/scenario.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::fields::{empty_as_none, timestamp};

/// Professional track a scenario trains for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Developer,
    Designer,
    ProjectManager,
    DataEntry,
    AiEngineer,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Developer => "developer",
            Category::Designer => "designer",
            Category::ProjectManager => "project_manager",
            Category::DataEntry => "data_entry",
            Category::AiEngineer => "ai_engineer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

/// Represents a record of the 'scenarios' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,

    pub title: String,

    pub description: String,

    pub category: Category,

    pub difficulty: Difficulty,

    /// Expected duration in minutes.
    pub duration: i64,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    pub is_active: bool,

    /// Id of the user who authored the scenario.
    pub created_by: String,

    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,
}

impl Scenario {
    /// Case-insensitive substring match on title or description.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Query parameters for listing scenarios.
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioListParams {
    pub q: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

/// DTO for creating a new scenario.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScenarioRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes."))]
    pub duration: i64,
    #[validate(url)]
    pub cover_image: Option<String>,
    pub is_active: Option<bool>,
}

/// Body written to the store when a scenario is created.
#[derive(Debug, Serialize)]
pub struct NewScenario {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub is_active: bool,
    pub created_by: String,
}
