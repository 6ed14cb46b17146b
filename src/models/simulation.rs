// src/models/simulation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{
    scenario::Scenario,
    submission::{Submission, validate_object},
    task::Task,
};
use crate::{simulation::Session, utils::format::format_clock};

/// DTO for starting a simulation.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSimulationRequest {
    #[validate(length(min = 1, max = 64))]
    pub scenario: String,
}

/// DTO for answering the current task of a running simulation.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitTaskRequest {
    #[validate(custom(function = validate_object))]
    pub content: Value,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub files: Vec<String>,
}

/// Snapshot of a session as returned to its owner.
#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub session_id: String,
    pub scenario: Scenario,
    pub current_index: usize,
    pub total_tasks: usize,
    pub current_task: Option<Task>,
    /// Seconds since start, frozen at completion.
    pub elapsed: i64,
    pub elapsed_display: String,
    pub task_elapsed: i64,
    pub finished: bool,
    pub submissions: Vec<Submission>,
    pub analytics_id: Option<String>,
}

impl SimulationStatus {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let run = &session.run;
        let elapsed = run.elapsed(now);

        Self {
            session_id: session.id.clone(),
            scenario: run.scenario().clone(),
            current_index: run.current_index(),
            total_tasks: run.tasks().len(),
            current_task: run.current_task().cloned(),
            elapsed,
            elapsed_display: format_clock(elapsed),
            task_elapsed: run.task_elapsed(now),
            finished: run.is_finished(),
            submissions: run.submissions().to_vec(),
            analytics_id: session.analytics_id.clone(),
        }
    }
}
