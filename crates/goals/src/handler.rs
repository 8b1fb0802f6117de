use crate::models::RawCreateGoalRequest;
use crate::service::{GoalError, GoalService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use common::{auth::CurrentUser, AppState};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for GoalError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            GoalError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            GoalError::NotFound => (StatusCode::NOT_FOUND, "Goal not found".to_string()),
            GoalError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn goals_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/achieved", get(achieved_goals))
        .route("/{id}", get(get_goal).delete(deactivate_goal))
        .route("/{id}/contributions", post(add_contribution))
        .route("/{id}/target", put(update_target))
        .with_state(state)
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, GoalError> {
    let goals = GoalService::list_goals(&state.db, user_id, Utc::now()).await?;
    Ok(Json(goals))
}

async fn achieved_goals(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, GoalError> {
    let goals = GoalService::achieved_goals(&state.db, user_id, Utc::now()).await?;
    Ok(Json(goals))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<RawCreateGoalRequest>,
) -> Result<impl IntoResponse, GoalError> {
    payload
        .validate()
        .map_err(|e| GoalError::InvalidInput(e.to_string()))?;

    let id = GoalService::create_goal(&state.db, user_id, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    let goal = GoalService::get_goal(&state.db, user_id, id, Utc::now()).await?;
    Ok(Json(goal))
}

#[derive(Deserialize)]
struct ContributionRequest {
    amount_dollars: f64,
}

async fn add_contribution(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ContributionRequest>,
) -> Result<impl IntoResponse, GoalError> {
    let goal =
        GoalService::add_contribution(&state.db, user_id, id, payload.amount_dollars, Utc::now())
            .await?;
    Ok(Json(goal))
}

#[derive(Deserialize)]
struct TargetRequest {
    target_amount_dollars: f64,
    target_date: Option<DateTime<Utc>>,
}

async fn update_target(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<TargetRequest>,
) -> Result<impl IntoResponse, GoalError> {
    let goal = GoalService::update_target(
        &state.db,
        user_id,
        id,
        payload.target_amount_dollars,
        payload.target_date,
        Utc::now(),
    )
    .await?;
    Ok(Json(goal))
}

async fn deactivate_goal(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    GoalService::deactivate_goal(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
