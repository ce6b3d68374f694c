use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::services::{PatientService, PaymentService, TreatmentNoteService};

#[derive(Clone)]
pub struct PatientCellState {
    pub config: Arc<AppConfig>,
    pub patients: Arc<PatientService>,
    pub payments: Arc<PaymentService>,
    pub treatment_notes: Arc<TreatmentNoteService>,
}

pub fn patient_routes(state: PatientCellState) -> Router {
    Router::new()
        .route("/", post(create_patient))
        .route("/payments", post(create_payment))
        .route("/treatment-notes", post(create_treatment_note))
        .route("/treatment-notes/doctors/{doctor_id}", get(list_doctor_treatment_notes))
        .route("/{patient_id}", get(get_patient))
        .route("/{patient_id}/payments", get(list_patient_payments))
        .route("/{patient_id}/treatment-notes", get(list_patient_treatment_notes))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
