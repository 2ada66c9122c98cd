use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(task_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<Arc<AppState>> {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/api/register", post(auth::register_post))
        .route("/api/login", post(auth::login_post))
}

fn task_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::protected::tasks;

    Router::new()
        .route("/api/tasks", get(tasks::task_list).post(tasks::task_create))
        .route("/api/tasks/board", get(tasks::task_board))
        .route(
            "/api/tasks/:id",
            axum::routing::put(tasks::task_update).delete(tasks::task_delete),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// `*` (or nothing configured) allows any origin; otherwise an explicit allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(allowed)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Taskboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Personal task tracker with a pending/completed/missed lifecycle",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/api/register, /api/login (public - token acquisition)",
            "tasks": "/api/tasks[/:id], /api/tasks/board (protected)",
        }
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    if state.ping().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database": "unavailable"
            })),
        )
    }
}
