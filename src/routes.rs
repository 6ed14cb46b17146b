// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, analytics, auth, scenario, simulation, submission, task},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public: health, register, login.
/// * Authenticated: catalog reads, submissions, analytics, dashboard, simulations.
/// * Trainer/admin: authoring and grading. Admin: user management.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    // Layers run outside in: auth first, then the role check.
    let staff_routes = Router::new()
        .route("/scenarios", post(scenario::create_scenario))
        .route("/scenarios/{id}/tasks", post(task::create_task))
        .route("/submissions/{id}", patch(submission::grade_submission))
        .layer(middleware::from_fn(staff_middleware))
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", post(admin::create_user))
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth.clone());

    let member_routes = Router::new()
        .route("/scenarios", get(scenario::list_scenarios))
        .route("/scenarios/{id}", get(scenario::get_scenario))
        .route("/scenarios/{id}/tasks", get(task::list_tasks))
        .route("/tasks/{id}", get(task::get_task))
        .route(
            "/submissions",
            get(submission::get_submission).post(submission::create_submission),
        )
        .route(
            "/analytics",
            get(analytics::list_analytics).post(analytics::create_analytics),
        )
        .route("/analytics/scenario/{id}", get(analytics::get_scenario_analytics))
        .route("/dashboard", get(analytics::dashboard))
        .route("/simulations", post(simulation::start_simulation))
        .route(
            "/simulations/{id}",
            get(simulation::get_simulation).delete(simulation::abandon_simulation),
        )
        .route("/simulations/{id}/submit", post(simulation::submit_task))
        .layer(require_auth);

    let api = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(staff_routes)
        .merge(member_routes);

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}
