use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{RegisterDoctorRequest, RejectDoctorRequest};
use crate::router::DoctorCellState;

#[axum::debug_handler]
pub async fn list_approved_doctors(
    State(state): State<DoctorCellState>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.registry.list_approved().await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<DoctorCellState>,
    Extension(_user): Extension<User>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = state.registry.register(request).await?;
    let doctor = state.registry.get(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Registration received and awaiting administrator approval"
    })))
}

#[axum::debug_handler]
pub async fn list_all_doctors(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let doctors = state.registry.list_all().await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn list_pending_doctors(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let doctors = state.registry.list_pending().await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<DoctorCellState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.registry.get(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_schedulable(
    State(state): State<DoctorCellState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedulable = state.registry.is_schedulable(doctor_id).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedulable": schedulable
    })))
}

#[axum::debug_handler]
pub async fn approve_doctor(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let doctor = state.registry.approve(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn reject_doctor(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<RejectDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let doctor = state.registry.reject(doctor_id, request.reason).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}
