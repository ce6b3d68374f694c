use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::NotificationService;

#[derive(Clone)]
pub struct NotificationCellState {
    pub config: Arc<AppConfig>,
    pub notifications: Arc<NotificationService>,
}

pub fn notification_routes(state: NotificationCellState) -> Router {
    let protected_routes = Router::new()
        .route("/patients/{patient_id}", get(handlers::list_patient_notifications))
        .route("/patients/{patient_id}/unread", get(handlers::get_unread_count))
        .route("/{notification_id}/read", post(handlers::mark_notification_read))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
