use crate::models::RawCreateBudgetRequest;
use crate::service::{BudgetError, BudgetService};
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

impl IntoResponse for BudgetError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            BudgetError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            BudgetError::NotFound => (StatusCode::NOT_FOUND, "Budget not found".to_string()),
            BudgetError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn budgets_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_budgets).post(create_budget))
        .route("/current", get(current_budgets))
        .route("/{id}", get(get_budget).delete(deactivate_budget))
        .route("/{id}/alerts", get(budget_alerts))
        .route("/{id}/spent", put(update_spent))
        .route("/{id}/spend", post(add_to_spent))
        .route("/{id}/reset", post(reset_for_new_period))
        .with_state(state)
}

async fn list_budgets(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, BudgetError> {
    let budgets = BudgetService::list_budgets(&state.db, user_id, Utc::now()).await?;
    Ok(Json(budgets))
}

async fn current_budgets(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, BudgetError> {
    let budgets = BudgetService::current_budgets(&state.db, user_id, Utc::now()).await?;
    Ok(Json(budgets))
}

async fn create_budget(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<RawCreateBudgetRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    payload
        .validate()
        .map_err(|e| BudgetError::InvalidInput(e.to_string()))?;

    let id = BudgetService::create_budget(&state.db, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_budget(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BudgetError> {
    let budget = BudgetService::get_budget(&state.db, user_id, id, Utc::now()).await?;
    Ok(Json(budget))
}

async fn budget_alerts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BudgetError> {
    let thresholds = BudgetService::check_notification_threshold(&state.db, user_id, id).await?;
    Ok(Json(json!({ "thresholds": thresholds })))
}

#[derive(Deserialize)]
struct SpentRequest {
    amount_dollars: f64,
}

async fn update_spent(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SpentRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    BudgetService::update_spent(&state.db, user_id, id, payload.amount_dollars).await?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct SpendRequest {
    delta_dollars: f64,
}

async fn add_to_spent(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SpendRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    BudgetService::add_to_spent(&state.db, user_id, id, payload.delta_dollars).await?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct ResetRequest {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

async fn reset_for_new_period(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ResetRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    BudgetService::reset_for_new_period(&state.db, user_id, id, payload.start_date, payload.end_date)
        .await?;
    Ok(StatusCode::OK)
}

async fn deactivate_budget(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BudgetError> {
    BudgetService::deactivate_budget(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
