use crate::models::RawCreateBillRequest;
use crate::service::{BillError, BillService};
use axum::{
    extract::{Path, Query, State},
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

impl IntoResponse for BillError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            BillError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            BillError::NotFound => (StatusCode::NOT_FOUND, "Bill not found".to_string()),
            BillError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn bills_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bills).post(create_bill))
        .route("/upcoming", get(upcoming_bills))
        .route("/overdue", get(overdue_bills))
        .route("/reminders", get(reminders_due))
        .route("/{id}", get(get_bill).put(update_bill).delete(deactivate_bill))
        .route("/{id}/pay", post(mark_as_paid))
        .route("/{id}/amount", put(update_amount))
        .with_state(state)
}

async fn list_bills(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, BillError> {
    let bills = BillService::list_bills(&state.db, user_id, Utc::now()).await?;
    Ok(Json(bills))
}

async fn create_bill(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<RawCreateBillRequest>,
) -> Result<impl IntoResponse, BillError> {
    payload
        .validate()
        .map_err(|e| BillError::InvalidInput(e.to_string()))?;

    let id = BillService::create_bill(&state.db, user_id, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Deserialize)]
struct UpcomingParams {
    days: Option<i64>,
}

async fn upcoming_bills(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<UpcomingParams>,
) -> Result<impl IntoResponse, BillError> {
    let days = params.days.unwrap_or(30);
    let bills = BillService::upcoming_bills(&state.db, user_id, Utc::now(), days).await?;
    Ok(Json(bills))
}

async fn overdue_bills(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, BillError> {
    let bills = BillService::overdue_bills(&state.db, user_id, Utc::now()).await?;
    Ok(Json(bills))
}

async fn reminders_due(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, BillError> {
    let bills = BillService::reminders_due(&state.db, user_id, Utc::now()).await?;
    Ok(Json(bills))
}

async fn get_bill(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BillError> {
    let bill = BillService::get_bill(&state.db, user_id, id, Utc::now()).await?;
    Ok(Json(bill))
}

async fn update_bill(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RawCreateBillRequest>,
) -> Result<impl IntoResponse, BillError> {
    payload
        .validate()
        .map_err(|e| BillError::InvalidInput(e.to_string()))?;

    let bill = BillService::update_bill(&state.db, user_id, id, payload, Utc::now()).await?;
    Ok(Json(bill))
}

#[derive(Deserialize, Default)]
struct PayRequest {
    paid_date: Option<DateTime<Utc>>,
}

async fn mark_as_paid(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<PayRequest>>,
) -> Result<impl IntoResponse, BillError> {
    let paid_date = payload
        .and_then(|Json(p)| p.paid_date)
        .unwrap_or_else(Utc::now);

    let bill = BillService::mark_as_paid(&state.db, user_id, id, paid_date).await?;
    Ok(Json(bill))
}

#[derive(Deserialize)]
struct AmountRequest {
    amount_dollars: f64,
}

async fn update_amount(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AmountRequest>,
) -> Result<impl IntoResponse, BillError> {
    BillService::update_amount(&state.db, user_id, id, payload.amount_dollars).await?;
    Ok(StatusCode::OK)
}

async fn deactivate_bill(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BillError> {
    BillService::deactivate_bill(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
