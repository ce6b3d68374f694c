use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_self_or_staff, require_staff};

use crate::models::{CreatePatientRequest, CreatePaymentRequest, CreateTreatmentNoteRequest};
use crate::router::PatientCellState;

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state.patients.create_patient(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let patient = state.patients.get_patient(patient_id, auth.token()).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn create_payment(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(patient_id) = request.patient_id {
        require_self_or_staff(&user, &patient_id.to_string())?;
    }

    let payment = state.payments.create_payment(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "payment": payment
    })))
}

#[axum::debug_handler]
pub async fn list_patient_payments(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let payments = state
        .payments
        .list_payments_for_patient(patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "payments": payments,
        "total": payments.len()
    })))
}

// ==============================================================================
// TREATMENT NOTES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_treatment_note(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTreatmentNoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let note = state.treatment_notes.create_note(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "treatment_note": note
    })))
}

#[axum::debug_handler]
pub async fn list_patient_treatment_notes(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let notes = state
        .treatment_notes
        .list_for_patient(patient_id, auth.token())
        .await?;

    Ok(Json(json!({
        "treatment_notes": notes,
        "total": notes.len()
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_treatment_notes(
    State(state): State<PatientCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let notes = state
        .treatment_notes
        .list_for_doctor(doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "treatment_notes": notes,
        "total": notes.len()
    })))
}
