use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::RecordStoreClient;

use crate::models::{require_fields, CreatePatientRequest, Patient, PatientError};

pub struct PatientService {
    store: RecordStoreClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: RecordStoreClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let present = |value: &Option<String>| value.as_deref().map_or(false, |v| !v.trim().is_empty());
        require_fields(&[
            ("name", present(&request.name)),
            ("age", request.age.is_some()),
            ("gender", present(&request.gender)),
            ("contact", present(&request.contact)),
        ])?;

        let patient_data = json!({
            "id": Uuid::new_v4(),
            "name": request.name.as_deref().map(str::trim),
            "age": request.age,
            "gender": request.gender.as_deref().map(str::trim),
            "contact": request.contact.as_deref().map(str::trim),
        });

        let row = self
            .store
            .insert("patients", patient_data, Some(auth_token))
            .await?;
        let patient: Patient = serde_json::from_value(row)?;

        info!("Patient record created with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or(PatientError::NotFound(patient_id))?;

        Ok(serde_json::from_value(row)?)
    }
}
