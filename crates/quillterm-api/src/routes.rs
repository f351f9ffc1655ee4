//! Route table and handlers for the system endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::ApiState;

#[derive(Serialize)]
struct ThemeResponse {
    name: String,
}

#[derive(Deserialize)]
struct SetThemeRequest {
    name: String,
}

#[derive(Serialize)]
struct ThemeListResponse {
    themes: Vec<String>,
    current: String,
}

#[derive(Serialize)]
struct StatusResponse {
    message: String,
}

#[derive(Deserialize)]
struct SetStatusRequest {
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn get_theme(State(state): State<Arc<ApiState>>) -> Json<ThemeResponse> {
    Json(ThemeResponse {
        name: state.control.current_theme(),
    })
}

async fn set_theme(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SetThemeRequest>,
) -> impl IntoResponse {
    match state.control.set_theme(&body.name) {
        Ok(()) => {
            tracing::info!(theme = %body.name, "theme changed over http");
            (
                StatusCode::OK,
                Json(ThemeResponse { name: body.name }),
            )
                .into_response()
        }
        Err(error) => (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response(),
    }
}

async fn list_themes(State(state): State<Arc<ApiState>>) -> Json<ThemeListResponse> {
    Json(ThemeListResponse {
        themes: state.control.theme_names(),
        current: state.control.current_theme(),
    })
}

async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: state.control.status_message(),
    })
}

async fn set_status(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SetStatusRequest>,
) -> Json<StatusResponse> {
    state.control.set_status_message(body.message);
    Json(StatusResponse {
        message: state.control.status_message(),
    })
}

/// Builds the full router. Every route sits behind the bearer middleware.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/v1/system/theme", get(get_theme).put(set_theme))
        .route("/api/v1/system/themes", get(list_themes))
        .route("/api/v1/system/status", get(get_status).put(set_status))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
