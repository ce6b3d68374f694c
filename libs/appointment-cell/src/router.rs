// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AppointmentLedger, SchedulerService};

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<AppointmentLedger>,
    pub scheduler: Arc<SchedulerService>,
}

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/emergency", post(handlers::insert_emergency))
        .route("/optimize", post(handlers::optimize_day))
        .route("/emergencies", get(handlers::list_emergencies))
        .route("/chairs", get(handlers::get_chair_statuses))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))

        // Appointment listings
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/doctors/{doctor_id}/today", get(handlers::get_doctor_today))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
