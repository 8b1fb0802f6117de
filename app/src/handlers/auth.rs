use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    auth::{AUTH_SESSION_KEY, DEFAULT_USER_ID, USER_SESSION_KEY},
    AppState,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let Some(correct_password) = &state.config.app_password else {
        // Auth disabled: logging in is a no-op success.
        return Json(json!({ "authenticated": true })).into_response();
    };

    if payload.password != *correct_password {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid password" })),
        )
            .into_response();
    }

    if session.insert(AUTH_SESSION_KEY, true).await.is_err()
        || session.insert(USER_SESSION_KEY, DEFAULT_USER_ID).await.is_err()
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Session error" })),
        )
            .into_response();
    }

    Json(json!({ "authenticated": true })).into_response()
}

pub async fn logout(session: Session) -> Response {
    let _ = session.delete().await;
    Json(json!({ "authenticated": false })).into_response()
}

pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}
