use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::AnalyticsService;

#[derive(Clone)]
pub struct AnalyticsCellState {
    pub config: Arc<AppConfig>,
    pub analytics: Arc<AnalyticsService>,
}

pub fn analytics_routes(state: AnalyticsCellState) -> Router {
    // Reports are for clinic administrators only
    let protected_routes = Router::new()
        .route("/chairs", get(handlers::get_chair_utilization))
        .route("/doctors", get(handlers::get_doctor_productivity))
        .route("/summary", get(handlers::get_clinic_summary))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
