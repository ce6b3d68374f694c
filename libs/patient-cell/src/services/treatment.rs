use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::services::DoctorRegistry;
use shared_config::AppConfig;
use shared_database::RecordStoreClient;

use crate::models::{require_fields, CreateTreatmentNoteRequest, PatientError, TreatmentNote};
use crate::services::PatientService;

const TREATMENT_NOTES_TABLE: &str = "treatment_notes";

pub struct TreatmentNoteService {
    store: RecordStoreClient,
    patients: Arc<PatientService>,
    doctors: Arc<DoctorRegistry>,
}

impl TreatmentNoteService {
    pub fn new(config: &AppConfig, patients: Arc<PatientService>, doctors: Arc<DoctorRegistry>) -> Self {
        Self {
            store: RecordStoreClient::new(config),
            patients,
            doctors,
        }
    }

    /// Store a note written by a registered doctor about an existing patient.
    pub async fn create_note(
        &self,
        request: CreateTreatmentNoteRequest,
        auth_token: &str,
    ) -> Result<TreatmentNote, PatientError> {
        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        require_fields(&[
            ("patient_id", request.patient_id.is_some()),
            ("doctor_id", request.doctor_id.is_some()),
            ("diagnosis", diagnosis.is_some()),
        ])?;

        let (Some(patient_id), Some(doctor_id), Some(diagnosis)) = (request.patient_id, request.doctor_id, diagnosis)
        else {
            return Err(PatientError::ValidationError("Incomplete treatment note".to_string()));
        };

        self.doctors
            .get(doctor_id)
            .await
            .map_err(|_| PatientError::DoctorNotFound(doctor_id))?;
        self.patients.get_patient(patient_id, auth_token).await?;

        let blank_to_none = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let row = self
            .store
            .insert(
                TREATMENT_NOTES_TABLE,
                json!({
                    "id": Uuid::new_v4(),
                    "doctor_id": doctor_id,
                    "patient_id": patient_id,
                    "diagnosis": diagnosis,
                    "treatment_plan": blank_to_none(request.treatment_plan),
                    "notes": blank_to_none(request.notes),
                }),
                Some(auth_token),
            )
            .await?;
        let note: TreatmentNote = serde_json::from_value(row)?;

        info!("Treatment note {} recorded by doctor {} for patient {}", note.id, doctor_id, patient_id);
        Ok(note)
    }

    /// Newest first.
    pub async fn list_for_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Vec<TreatmentNote>, PatientError> {
        debug!("Fetching treatment notes for patient: {}", patient_id);
        self.list_where("patient_id", patient_id, auth_token).await
    }

    /// Newest first.
    pub async fn list_for_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Vec<TreatmentNote>, PatientError> {
        debug!("Fetching treatment notes by doctor: {}", doctor_id);
        self.list_where("doctor_id", doctor_id, auth_token).await
    }

    async fn list_where(&self, column: &str, id: Uuid, auth_token: &str) -> Result<Vec<TreatmentNote>, PatientError> {
        let path = format!(
            "/rest/v1/{}?{}=eq.{}&order=created_at.desc",
            TREATMENT_NOTES_TABLE, column, id
        );
        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(PatientError::from))
            .collect()
    }
}
