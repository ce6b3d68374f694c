// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, require_self_or_staff, require_staff};

use crate::models::{
    BookAppointmentRequest, ChairQuery, EmergencyRequest, OptimizeDayRequest, UpdateStatusRequest,
};
use crate::router::AppointmentCellState;

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients book for themselves; staff may book on anyone's behalf
    require_self_or_staff(&user, &request.patient_id.to_string())?;

    let appointment = state.scheduler.book_routine(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn insert_emergency(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<EmergencyRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = state.scheduler.insert_emergency(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Emergency appointment scheduled"
    })))
}

#[axum::debug_handler]
pub async fn optimize_day(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<OptimizeDayRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = state.scheduler.optimize_day(request.changes).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "updated": appointments.len()
    })))
}

// ==============================================================================
// APPOINTMENT LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.ledger.get(appointment_id).await?;
    require_self_or_staff(&user, &appointment.patient_id.to_string())?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let appointment = state
        .scheduler
        .update_status(appointment_id, &request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let existing = state.ledger.get(appointment_id).await?;
    require_self_or_staff(&user, &existing.patient_id.to_string())?;

    let appointment = state.scheduler.cancel(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let appointments = state.ledger.list_by_doctor(doctor_id).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_today(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let today = Local::now().date_naive();
    let appointments = state.ledger.list_today_by_doctor(doctor_id, today).await;

    Ok(Json(json!({
        "date": today,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let appointments = state.ledger.list_by_patient(patient_id).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_emergencies(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = state.ledger.list_emergencies().await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_chair_statuses(
    State(state): State<AppointmentCellState>,
    Extension(_user): Extension<User>,
    Query(query): Query<ChairQuery>,
) -> Result<Json<Value>, AppError> {
    let chairs = state.ledger.chair_statuses(query.date, query.time).await;
    let next_available = state.ledger.find_available(query.date, query.time).await;

    Ok(Json(json!({
        "date": query.date,
        "time": query.time,
        "chairs": chairs,
        "next_available": next_available
    })))
}
