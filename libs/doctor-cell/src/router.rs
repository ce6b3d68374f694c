use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::DoctorRegistry;

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<DoctorRegistry>,
}

pub fn doctor_routes(state: DoctorCellState) -> Router {
    // Patients browse approved doctors without signing in
    let public_routes = Router::new()
        .route("/", get(handlers::list_approved_doctors));

    let protected_routes = Router::new()
        .route("/register", post(handlers::register_doctor))
        .route("/all", get(handlers::list_all_doctors))
        .route("/pending", get(handlers::list_pending_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/schedulable", get(handlers::get_schedulable))
        .route("/{doctor_id}/approve", post(handlers::approve_doctor))
        .route("/{doctor_id}/reject", post(handlers::reject_doctor))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
