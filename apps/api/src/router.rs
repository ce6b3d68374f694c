use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tracing::{info, warn};

use analytics_cell::{analytics_routes, AnalyticsCellState, AnalyticsService};
use appointment_cell::services::{AppointmentLedger, ChairPool, NotificationSink, SchedulerService};
use appointment_cell::{appointment_routes, AppointmentCellState};
use doctor_cell::services::DoctorRegistry;
use doctor_cell::{doctor_routes, DoctorCellState};
use notification_cell::services::NotificationService;
use notification_cell::{notification_routes, NotificationCellState};
use patient_cell::{patient_routes, PatientCellState, PatientService, PaymentService, TreatmentNoteService};
use shared_config::AppConfig;
use shared_database::{MemoryTableStore, RecordStoreClient, TableStore};

/// Router over the configured record store. Clinic state is loaded from
/// the store before the first request is served.
pub async fn create_router(config: Arc<AppConfig>) -> Result<Router> {
    let store: Arc<dyn TableStore> = if config.record_store_url.is_empty() {
        warn!("RECORD_STORE_URL not set, clinic state is kept in memory only");
        Arc::new(MemoryTableStore::new())
    } else {
        Arc::new(RecordStoreClient::new(&config))
    };
    build_router(config, store).await
}

pub async fn build_router(config: Arc<AppConfig>, store: Arc<dyn TableStore>) -> Result<Router> {
    let registry = Arc::new(DoctorRegistry::load(store.clone()).await?);
    let chairs = ChairPool::load(store.as_ref(), config.chair_count).await?;
    let ledger = Arc::new(AppointmentLedger::load(registry.clone(), chairs, store.clone()).await?);
    let notifications = Arc::new(NotificationService::load(store).await?);
    let sink: Arc<dyn NotificationSink> = notifications.clone();
    let scheduler = Arc::new(SchedulerService::new(ledger.clone(), sink));
    let analytics = Arc::new(AnalyticsService::new(ledger.clone(), registry.clone(), &config));
    let patients = Arc::new(PatientService::new(&config));
    let payments = Arc::new(PaymentService::new(&config, patients.clone(), notifications.clone()));
    let treatment_notes = Arc::new(TreatmentNoteService::new(&config, patients.clone(), registry.clone()));

    info!("Clinic configured with {} chairs", ledger.chair_pool().len());

    let router = Router::new()
        .route("/", get(|| async { "Dental clinic scheduling API is running!" }))
        .nest(
            "/doctors",
            doctor_routes(DoctorCellState {
                config: config.clone(),
                registry: registry.clone(),
            }),
        )
        .nest(
            "/appointments",
            appointment_routes(AppointmentCellState {
                config: config.clone(),
                ledger,
                scheduler,
            }),
        )
        .nest(
            "/notifications",
            notification_routes(NotificationCellState {
                config: config.clone(),
                notifications,
            }),
        )
        .nest(
            "/analytics",
            analytics_routes(AnalyticsCellState {
                config: config.clone(),
                analytics,
            }),
        )
        .nest(
            "/patients",
            patient_routes(PatientCellState {
                config,
                patients,
                payments,
                treatment_notes,
            }),
        );
    Ok(router)
}
