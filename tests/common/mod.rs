// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use simulex::{
    config::Config,
    handlers::auth::create_user,
    models::user::Role,
    routes,
    state::AppState,
    store::{MemoryStore, RecordStore},
};

pub struct TestApp {
    pub address: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port, backed by the in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryStore::new())).await
}

pub async fn spawn_app_with_store(store: Arc<dyn RecordStore>) -> TestApp {
    let config = Config::for_memory_store("test_secret_for_integration_tests");
    let state = AppState::new(store, config);

    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        state,
        client: reqwest::Client::new(),
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@simulex.test", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Registers a trainee through the API and returns its token.
    pub async fn trainee_token(&self) -> String {
        let email = unique_email("trainee");
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": "password123",
                "password_confirm": "password123",
                "name": "Trainee",
            }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);

        self.login(&email, "password123").await
    }

    /// Creates a user with the given role straight in the store and returns its token.
    pub async fn token_with_role(&self, role: Role) -> String {
        let email = unique_email(role.as_str());
        create_user(
            self.state.store.as_ref(),
            &email,
            "password123",
            "Staff",
            role,
            "SimulEx",
        )
        .await
        .expect("Failed to create user");

        self.login(&email, "password123").await
    }

    /// Creates a scenario with tasks (given as `(title, order)`) as a trainer.
    pub async fn seed_scenario(&self, trainer: &str, category: &str, tasks: &[(&str, i64)]) -> Value {
        let scenario: Value = self
            .client
            .post(self.url("/api/scenarios"))
            .bearer_auth(trainer)
            .json(&json!({
                "title": "Web Application Development",
                "description": "Build a responsive web application with user authentication.",
                "category": category,
                "difficulty": "intermediate",
                "duration": 120,
            }))
            .send()
            .await
            .expect("Create scenario failed")
            .json()
            .await
            .unwrap();

        let id = scenario["id"].as_str().unwrap().to_string();
        for (title, order) in tasks {
            let response = self
                .client
                .post(self.url(&format!("/api/scenarios/{}/tasks", id)))
                .bearer_auth(trainer)
                .json(&json!({
                    "title": title,
                    "description": "Complete the step.",
                    "type": "code",
                    "content": {
                        "instructions": "Create a new React project",
                        "acceptance_criteria": ["Project structure is correctly set up"],
                    },
                    "order": order,
                    "time_limit": 900,
                    "points": 10,
                }))
                .send()
                .await
                .expect("Create task failed");
            assert_eq!(response.status().as_u16(), 201);
        }

        scenario
    }
}
