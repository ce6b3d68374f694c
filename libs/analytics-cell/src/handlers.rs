use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{DateQuery, SummaryQuery};
use crate::router::AnalyticsCellState;

#[axum::debug_handler]
pub async fn get_chair_utilization(
    State(state): State<AnalyticsCellState>,
    Extension(user): Extension<User>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let chairs = state.analytics.chair_utilization(query.date).await;

    Ok(Json(json!({
        "date": query.date,
        "capacity": state.config.chair_daily_capacity,
        "chairs": chairs
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_productivity(
    State(state): State<AnalyticsCellState>,
    Extension(user): Extension<User>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let doctors = state.analytics.doctor_productivity(query.date).await;

    Ok(Json(json!({
        "date": query.date,
        "capacity": state.config.doctor_daily_capacity,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_clinic_summary(
    State(state): State<AnalyticsCellState>,
    Extension(user): Extension<User>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let summary = state.analytics.summary(query.from, query.to).await?;
    Ok(Json(json!(summary)))
}
