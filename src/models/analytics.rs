// src/models/analytics.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::{fields::timestamp, scenario::Scenario};

/// Outcome of one task within a simulation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub task_id: String,
    pub score: f64,
    pub time_spent: i64,
}

/// Metrics bag of an analytics record.
/// Dimensions beyond the computed ones (e.g. `creativity`) are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub task_completion: Vec<TaskCompletion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Represents a record of the 'analytics' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub id: String,

    pub user: String,

    pub scenario: String,

    pub metrics: Metrics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_recording: Option<Value>,

    pub total_score: f64,

    /// Seconds from simulation start to completion.
    pub completion_time: i64,

    #[serde(with = "timestamp")]
    pub completed_at: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,
}

/// DTO for storing an analytics record directly.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnalyticsRequest {
    #[validate(length(min = 1, max = 64))]
    pub scenario: String,
    #[serde(default)]
    pub metrics: Metrics,
    pub session_recording: Option<Value>,
    #[validate(range(min = 0.0))]
    pub total_score: f64,
    #[validate(range(min = 0))]
    pub completion_time: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Body written to the store when an analytics record is created.
#[derive(Debug, Serialize)]
pub struct NewAnalytics {
    pub user: String,
    pub scenario: String,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_recording: Option<Value>,
    pub total_score: f64,
    pub completion_time: i64,
    #[serde(with = "timestamp")]
    pub completed_at: DateTime<Utc>,
}

/// Aggregated view for the current user's dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub completed_scenarios: usize,
    pub average_score: f64,
    /// Seconds across all completed attempts.
    pub total_time: i64,
    pub total_time_display: String,
    pub recent_scenarios: Vec<Scenario>,
    pub analytics: Vec<Analytics>,
}

/// Mean total score of the given records, 0 when there are none.
pub fn average_score(records: &[Analytics]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|a| a.total_score).sum::<f64>() / records.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analytics(total_score: f64) -> Analytics {
        serde_json::from_value(json!({
            "id": "a1",
            "user": "u1",
            "scenario": "s1",
            "metrics": {
                "accuracy": total_score,
                "creativity": 0.8,
                "task_completion": [{"task_id": "t1", "score": total_score, "time_spent": 30}],
            },
            "session_recording": null,
            "total_score": total_score,
            "completion_time": 30,
            "completed_at": "2024-01-01 00:10:00.000Z",
            "created": "2024-01-01 00:10:00.000Z",
            "updated": "2024-01-01 00:10:00.000Z",
        }))
        .unwrap()
    }

    #[test]
    fn metrics_keep_extra_dimensions() {
        let a = analytics(0.9);
        assert_eq!(a.metrics.extra["creativity"], json!(0.8));
        assert_eq!(a.metrics.efficiency, 0.0);
        assert_eq!(a.session_recording, None);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average_score(&[]), 0.0);
        let avg = average_score(&[analytics(0.5), analytics(1.0)]);
        assert!((avg - 0.75).abs() < 1e-9);
    }
}
