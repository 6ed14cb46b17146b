// src/simulation/registry.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};

use super::runner::SimulationRun;
use crate::{config::SESSION_SWEEP_INTERVAL_SECS, error::AppError, store::new_record_id};

/// A simulation run held by the service on behalf of one user.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub run: SimulationRun,
    pub last_activity: DateTime<Utc>,
    /// Set once the finished run's analytics record is stored.
    pub analytics_id: Option<String>,
}

impl Session {
    pub fn new(user_id: &str, run: SimulationRun, now: DateTime<Utc>) -> Self {
        Self {
            id: new_record_id(),
            user_id: user_id.to_string(),
            run,
            last_activity: now,
            analytics_id: None,
        }
    }

    pub fn ensure_owner(&self, user_id: &str) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access Denied".to_string()))
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// In-process table of live sessions.
///
/// Each session sits behind its own mutex so two submits for the same run
/// cannot both advance it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) -> SessionHandle {
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    pub async fn get(&self, id: &str) -> Result<SessionHandle, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Simulation session not found".to_string()))
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle for longer than `ttl_secs`. Sessions currently
    /// locked by a request are in use and left alone.
    pub async fn sweep(&self, now: DateTime<Utc>, ttl_secs: u64) -> usize {
        let ttl = chrono::Duration::seconds(ttl_secs as i64);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now - session.last_activity <= ttl,
            Err(_) => true,
        });

        before - sessions.len()
    }

    /// Background task sweeping idle sessions on a fixed tick.
    pub fn spawn_reaper(self: Arc<Self>, ttl_secs: u64) -> JoinHandle<()> {
        self.spawn_reaper_every(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS), ttl_secs)
    }

    pub fn spawn_reaper_every(self: Arc<Self>, period: Duration, ttl_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = self.sweep(Utc::now(), ttl_secs).await;
                if removed > 0 {
                    tracing::info!("Reaped {} idle simulation session(s)", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{scenario::Scenario, task::Task};
    use serde_json::json;

    fn run(now: DateTime<Utc>) -> SimulationRun {
        let scenario: Scenario = serde_json::from_value(json!({
            "id": "s1", "title": "T", "description": "D", "category": "designer",
            "difficulty": "beginner", "duration": 90, "is_active": true, "created_by": "u",
            "created": "2024-01-01T00:00:00Z", "updated": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        let task: Task = serde_json::from_value(json!({
            "id": "t1", "title": "T", "description": "D", "scenario": "s1", "type": "design",
            "content": {"instructions": "Sketch"}, "order": 1, "points": 5,
            "created": "2024-01-01T00:00:00Z", "updated": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        SimulationRun::start(scenario, vec![task], now).unwrap()
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let registry = SessionRegistry::new();
        let now = Utc::now();

        let stale = Session::new("u1", run(now), now - chrono::Duration::seconds(500));
        let fresh = Session::new("u2", run(now), now);
        let stale_id = stale.id.clone();
        let fresh_id = fresh.id.clone();
        registry.insert(stale).await;
        registry.insert(fresh).await;

        assert_eq!(registry.sweep(now, 300).await, 1);
        assert!(registry.get(&stale_id).await.is_err());
        assert!(registry.get(&fresh_id).await.is_ok());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn busy_sessions_survive_a_sweep() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        let handle = registry
            .insert(Session::new("u1", run(now), now - chrono::Duration::seconds(10_000)))
            .await;

        let _guard = handle.lock().await;
        assert_eq!(registry.sweep(now, 60).await, 0);
        assert!(!registry.is_empty().await);
    }

    #[tokio::test]
    async fn reaper_clears_idle_sessions_in_the_background() {
        let registry = Arc::new(SessionRegistry::new());
        let now = Utc::now();
        let idle = now - chrono::Duration::seconds(10);
        registry.insert(Session::new("u1", run(now), idle)).await;
        registry.insert(Session::new("u2", run(now), idle)).await;

        let reaper = Arc::clone(&registry).spawn_reaper_every(Duration::from_millis(20), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.is_empty().await);

        // Keeps running after a sweep
        assert!(!reaper.is_finished());
        reaper.abort();
    }

    #[test]
    fn only_the_owner_may_drive_a_session() {
        let now = Utc::now();
        let session = Session::new("u1", run(now), now);
        assert!(session.ensure_owner("u1").is_ok());
        assert!(matches!(session.ensure_owner("u2"), Err(AppError::Forbidden(_))));
    }
}
