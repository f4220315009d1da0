//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{CommandResponse, ErrorResponse, InputRequest};
use super::AppState;
use crate::runtime::{GameSnapshot, RuntimeError};
use crate::state_machine::{Event, TransitionError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route("/assets/*path", get(serve_static))
        .route("/api/game", get(get_game))
        .route("/api/game/start", post(start_game))
        .route("/api/game/input", post(submit_input))
        .route("/api/game/stream", get(stream_game))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - page not embedded</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Game
// ============================================================

async fn get_game(State(state): State<AppState>) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(state.game.snapshot().await?))
}

async fn start_game(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.game.submit(Event::StartGame).await?;
    Ok((StatusCode::ACCEPTED, Json(CommandResponse { accepted: true })))
}

async fn submit_input(
    State(state): State<AppState>,
    Json(req): Json<InputRequest>,
) -> Result<Response, AppError> {
    match state.game.submit(Event::player_input(req.text)).await {
        Ok(()) => {
            Ok((StatusCode::ACCEPTED, Json(CommandResponse { accepted: true })).into_response())
        }
        Err(RuntimeError::Rejected(TransitionError::BlankInput)) => {
            Ok(Json(CommandResponse { accepted: false }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn stream_game(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (snapshot, rx) = state.game.subscribe().await?;
    Ok(sse_stream(snapshot, rx))
}

async fn get_version() -> &'static str {
    concat!("island-adventure ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(error: RuntimeError) -> Self {
        let message = error.to_string();
        match error {
            RuntimeError::Rejected(
                TransitionError::Busy
                | TransitionError::AlreadyStarted
                | TransitionError::NotStarted,
            ) => AppError::Conflict(message),
            RuntimeError::Rejected(TransitionError::BlankInput) => AppError::BadRequest(message),
            RuntimeError::Rejected(TransitionError::InvalidTransition(_))
            | RuntimeError::Stopped => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
