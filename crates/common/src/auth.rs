use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;

use crate::AppState;

pub const AUTH_SESSION_KEY: &str = "authenticated";
pub const USER_SESSION_KEY: &str = "user_id";

/// Owner id bound to the session at login. The deployment model is a
/// single shared password, so every session maps to the same owner.
pub const DEFAULT_USER_ID: i64 = 1;

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Authentication required" })),
    )
        .into_response()
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    // If no password is set, authentication is disabled
    if state.config.app_password.is_none() {
        return next.run(request).await;
    }

    let authenticated: bool = session
        .get(AUTH_SESSION_KEY)
        .await
        .unwrap_or(None)
        .unwrap_or(false);

    if authenticated {
        next.run(request).await
    } else {
        unauthorized()
    }
}

/// Extracts the owning user id from the session. All entity queries
/// are scoped by this id.
pub struct CurrentUser(pub i64);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|err| err.into_response())?;

        let user_id: Option<i64> = session.get(USER_SESSION_KEY).await.unwrap_or(None);

        match user_id {
            Some(id) => Ok(CurrentUser(id)),
            // With auth disabled there is no login step to bind the id.
            None if state.config.app_password.is_none() => Ok(CurrentUser(DEFAULT_USER_ID)),
            None => Err(unauthorized()),
        }
    }
}
