use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

pub use notification_cell::models::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
}

/// Fields are optional so a missing one surfaces as a validation error
/// naming it, not as a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub patient_id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub patient_id: Option<Uuid>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
}

/// A doctor's clinical record of a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentNote {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub diagnosis: String,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTreatmentNoteRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(Uuid),

    #[error("Doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Record store error: {0}")]
    RecordStore(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(err: anyhow::Error) -> Self {
        PatientError::RecordStore(err.to_string())
    }
}

impl From<serde_json::Error> for PatientError {
    fn from(err: serde_json::Error) -> Self {
        PatientError::RecordStore(format!("Unexpected record shape: {}", err))
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        let message = err.to_string();
        match err {
            PatientError::NotFound(_) | PatientError::DoctorNotFound(_) => AppError::NotFound(message),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::RecordStore(msg) => AppError::ExternalService(msg),
        }
    }
}

/// Fails naming every required field that is absent or blank.
pub(crate) fn require_fields(fields: &[(&'static str, bool)]) -> Result<(), PatientError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PatientError::ValidationError(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}
