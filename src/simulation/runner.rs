// src/simulation/runner.rs

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    config::DEFAULT_TASK_SCORE,
    error::AppError,
    models::{
        analytics::{Metrics, NewAnalytics, TaskCompletion},
        scenario::Scenario,
        submission::{NewSubmission, Submission},
        task::Task,
    },
    utils::format::seconds_between,
};

/// Where a run stands after a submission was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the task at this index.
    Next(usize),
    /// That was the last task.
    Finished,
}

/// One attempt at a scenario: walks the ordered task list, timing each task.
///
/// The clock is always passed in, so the run itself never reads the time.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    scenario: Scenario,
    tasks: Vec<Task>,
    current: usize,
    started_at: DateTime<Utc>,
    task_started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    submissions: Vec<Submission>,
}

impl SimulationRun {
    pub fn start(scenario: Scenario, mut tasks: Vec<Task>, now: DateTime<Utc>) -> Result<Self, AppError> {
        if tasks.is_empty() {
            return Err(AppError::NotFound("Simulation data not found".to_string()));
        }
        tasks.sort_by_key(|t| t.order);

        Ok(Self {
            scenario,
            tasks,
            current: 0,
            started_at: now,
            task_started_at: now,
            finished_at: None,
            submissions: Vec::new(),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// `None` once the run is finished.
    pub fn current_task(&self) -> Option<&Task> {
        if self.is_finished() {
            None
        } else {
            self.tasks.get(self.current)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds since the start; frozen once finished.
    pub fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        seconds_between(self.started_at, self.finished_at.unwrap_or(now))
    }

    /// Seconds spent on the current task so far.
    pub fn task_elapsed(&self, now: DateTime<Utc>) -> i64 {
        if self.is_finished() {
            0
        } else {
            seconds_between(self.task_started_at, now)
        }
    }

    /// Builds the submission record for the current task.
    pub fn prepare_submission(
        &self,
        user_id: &str,
        content: Value,
        files: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<NewSubmission, AppError> {
        let task = self
            .current_task()
            .ok_or_else(|| AppError::BadRequest("Simulation already completed".to_string()))?;

        Ok(NewSubmission {
            user: user_id.to_string(),
            task: task.id.clone(),
            content,
            files,
            time_spent: self.task_elapsed(now),
            completed: true,
        })
    }

    /// Records a stored submission for the current task and advances.
    pub fn record_submission(&mut self, submission: Submission, now: DateTime<Utc>) -> Advance {
        self.submissions.push(submission);

        if self.current + 1 < self.tasks.len() {
            self.current += 1;
            self.task_started_at = now;
            Advance::Next(self.current)
        } else {
            self.finished_at = Some(now);
            Advance::Finished
        }
    }

    /// Per-task outcomes; unscored (or zero-scored) submissions count as the default score.
    pub fn task_completion(&self) -> Vec<TaskCompletion> {
        self.submissions
            .iter()
            .map(|s| TaskCompletion {
                task_id: s.task.clone(),
                score: s.score.filter(|score| *score > 0.0).unwrap_or(DEFAULT_TASK_SCORE),
                time_spent: s.time_spent,
            })
            .collect()
    }

    /// The analytics record for a finished (or force-summarized) run.
    ///
    /// Only measured dimensions are written. Soft-skill scores such as
    /// `creativity` have no source in a run and are left to whoever posts
    /// analytics directly.
    pub fn summarize(&self, user_id: &str, now: DateTime<Utc>) -> NewAnalytics {
        let task_completion = self.task_completion();
        let total_score = if task_completion.is_empty() {
            0.0
        } else {
            task_completion.iter().map(|t| t.score).sum::<f64>() / task_completion.len() as f64
        };

        let completion_time = self.elapsed(now);
        let expected = (self.scenario.duration * 60) as f64;
        let efficiency = if completion_time == 0 {
            1.0
        } else {
            (expected / completion_time as f64).min(1.0)
        };

        NewAnalytics {
            user: user_id.to_string(),
            scenario: self.scenario.id.clone(),
            metrics: Metrics {
                accuracy: total_score,
                efficiency,
                task_completion,
                extra: Map::new(),
            },
            session_recording: None,
            total_score,
            completion_time,
            completed_at: self.finished_at.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn scenario(duration: i64) -> Scenario {
        serde_json::from_value(json!({
            "id": "s1",
            "title": "Web Application Development",
            "description": "Build a responsive web application",
            "category": "developer",
            "difficulty": "intermediate",
            "duration": duration,
            "is_active": true,
            "created_by": "admin",
            "created": "2024-01-01T00:00:00Z",
            "updated": "2024-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    fn task(id: &str, order: i64) -> Task {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("Task {}", id),
            "description": "Do it",
            "scenario": "s1",
            "type": "code",
            "content": {"instructions": "Write code"},
            "order": order,
            "points": 10,
            "created": "2024-01-01T00:00:00Z",
            "updated": "2024-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    fn stored(new: NewSubmission, score: Option<f64>) -> Submission {
        Submission {
            id: format!("sub{}", new.task),
            user: new.user,
            task: new.task,
            content: new.content,
            files: new.files,
            score,
            feedback: None,
            time_spent: new.time_spent,
            completed: new.completed,
            created: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn empty_scenario_cannot_start() {
        let err = SimulationRun::start(scenario(60), vec![], Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Simulation data not found"));
    }

    #[test]
    fn walks_tasks_in_order_and_times_each() {
        let t0 = Utc::now();
        let mut run = SimulationRun::start(
            scenario(60),
            vec![task("c", 3), task("a", 1), task("b", 2)],
            t0,
        )
        .unwrap();
        assert_eq!(run.current_task().unwrap().id, "a");

        let t1 = t0 + Duration::seconds(40);
        let first = run.prepare_submission("u1", json!({"code": "x"}), vec![], t1).unwrap();
        assert_eq!(first.task, "a");
        assert_eq!(first.time_spent, 40);
        assert_eq!(run.record_submission(stored(first, None), t1), Advance::Next(1));

        let t2 = t1 + Duration::seconds(25);
        let second = run.prepare_submission("u1", json!({}), vec![], t2).unwrap();
        assert_eq!(second.task, "b");
        assert_eq!(second.time_spent, 25);
        assert_eq!(run.record_submission(stored(second, Some(0.5)), t2), Advance::Next(2));

        let t3 = t2 + Duration::seconds(5);
        let third = run.prepare_submission("u1", json!({}), vec![], t3).unwrap();
        assert_eq!(run.record_submission(stored(third, Some(1.0)), t3), Advance::Finished);

        assert!(run.is_finished());
        assert!(run.current_task().is_none());
        assert_eq!(run.elapsed(t3 + Duration::seconds(100)), 70);
        assert!(run.prepare_submission("u1", json!({}), vec![], t3).is_err());
    }

    #[test]
    fn summary_averages_every_submission() {
        let t0 = Utc::now();
        let mut run = SimulationRun::start(scenario(1), vec![task("a", 1), task("b", 2)], t0).unwrap();

        let t1 = t0 + Duration::seconds(60);
        let a = run.prepare_submission("u1", json!({}), vec![], t1).unwrap();
        run.record_submission(stored(a, Some(0.0)), t1);

        let t2 = t1 + Duration::seconds(60);
        let b = run.prepare_submission("u1", json!({}), vec![], t2).unwrap();
        run.record_submission(stored(b, Some(0.6)), t2);

        let summary = run.summarize("u1", t2);
        assert_eq!(summary.metrics.task_completion.len(), 2);
        // zero score falls back to the default 0.8
        assert!((summary.total_score - 0.7).abs() < 1e-9);
        assert_eq!(summary.metrics.accuracy, summary.total_score);
        assert_eq!(summary.completion_time, 120);
        // 1 minute expected, 2 minutes taken
        assert!((summary.metrics.efficiency - 0.5).abs() < 1e-9);
        assert_eq!(summary.completed_at, t2);
        assert_eq!(summary.scenario, "s1");
    }

    #[test]
    fn instant_completion_is_fully_efficient() {
        let t0 = Utc::now();
        let mut run = SimulationRun::start(scenario(30), vec![task("a", 1)], t0).unwrap();
        let a = run.prepare_submission("u1", json!({}), vec![], t0).unwrap();
        run.record_submission(stored(a, None), t0);
        let summary = run.summarize("u1", t0);
        assert_eq!(summary.metrics.efficiency, 1.0);
        assert!((summary.total_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn summary_has_no_unmeasured_dimensions() {
        let t0 = Utc::now();
        let mut run = SimulationRun::start(scenario(30), vec![task("a", 1)], t0).unwrap();
        let a = run.prepare_submission("u1", json!({}), vec![], t0).unwrap();
        run.record_submission(stored(a, Some(0.9)), t0);

        let summary = run.summarize("u1", t0);
        assert!(summary.metrics.extra.is_empty());

        let metrics = serde_json::to_value(&summary.metrics).unwrap();
        let mut keys: Vec<&str> = metrics.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["accuracy", "efficiency", "task_completion"]);
    }
}
