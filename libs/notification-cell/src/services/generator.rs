// =====================================================================================
// NOTIFICATION GENERATOR SERVICE
// =====================================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::services::NotificationSink;
use shared_database::{MemoryTableStore, TableStore};
use shared_models::error::SchedulingError;

use crate::models::{NotificationRecord, NotificationType, PaymentEvent, PaymentStatus};

pub const NOTIFICATIONS_TABLE: &str = "notifications";

/// Patient-facing notification store. Records are append-only apart from
/// the read flag.
pub struct NotificationService {
    store: Arc<dyn TableStore>,
    records: Arc<RwLock<Vec<NotificationRecord>>>,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::with_store(Arc::new(MemoryTableStore::new()))
    }
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Service holding every stored notification in emission order.
    pub async fn load(store: Arc<dyn TableStore>) -> Result<Self> {
        let rows = store.load(NOTIFICATIONS_TABLE).await?;
        let mut records = rows
            .into_iter()
            .map(serde_json::from_value::<NotificationRecord>)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        info!("Loaded {} notifications", records.len());

        Ok(Self {
            store,
            records: Arc::new(RwLock::new(records)),
        })
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn on_booking(&self, appointment: &Appointment) -> Result<NotificationRecord> {
        let when = format!("{} at {}", appointment.date, appointment.time.format("%H:%M"));
        let chair = appointment
            .chair_id
            .map(|id| format!(" in chair {}", id))
            .unwrap_or_default();

        let (title, message, action_required) = if appointment.is_emergency() {
            (
                "Emergency Appointment Scheduled",
                format!("An emergency appointment has been scheduled for {}{}. Please arrive promptly.", when, chair),
                false,
            )
        } else if appointment.status == AppointmentStatus::Pending {
            (
                "Appointment Pending",
                format!("Your appointment request for {} is awaiting confirmation.", when),
                true,
            )
        } else {
            (
                "Appointment Confirmed",
                format!("Your appointment on {} is confirmed{}.", when, chair),
                false,
            )
        };

        self.emit(
            appointment.patient_id,
            NotificationType::Appointment,
            title,
            message,
            action_required,
            Some(appointment.id),
        )
        .await
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn on_cancellation(&self, appointment: &Appointment) -> Result<NotificationRecord> {
        let message = format!(
            "Your appointment on {} at {} has been cancelled.",
            appointment.date,
            appointment.time.format("%H:%M")
        );

        self.emit(
            appointment.patient_id,
            NotificationType::Appointment,
            "Appointment Cancelled",
            message,
            false,
            Some(appointment.id),
        )
        .await
    }

    #[instrument(skip(self, payment), fields(patient_id = %payment.patient_id, status = %payment.status))]
    pub async fn on_payment(&self, payment: &PaymentEvent) -> Result<NotificationRecord> {
        let (title, message) = match payment.status {
            PaymentStatus::Pending => (
                "Payment Pending",
                format!("Don't forget to complete your payment of {:.2}.", payment.amount),
            ),
            PaymentStatus::Completed => (
                "Payment Received",
                format!("We received your payment of {:.2} on {}. Thank you.", payment.amount, payment.date),
            ),
            PaymentStatus::Failed => (
                "Payment Failed",
                format!("Your payment of {:.2} on {} did not go through.", payment.amount, payment.date),
            ),
            PaymentStatus::Refunded => (
                "Payment Refunded",
                format!("Your payment of {:.2} has been refunded.", payment.amount),
            ),
        };

        self.emit(
            payment.patient_id,
            NotificationType::Payment,
            title,
            message,
            payment.status == PaymentStatus::Pending,
            None,
        )
        .await
    }

    /// The patient's notifications, newest first.
    pub async fn list_for_patient(&self, patient_id: Uuid) -> Vec<NotificationRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .rev()
            .filter(|record| record.patient_id == patient_id)
            .cloned()
            .collect()
    }

    pub async fn unread_count(&self, patient_id: Uuid) -> usize {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|record| record.patient_id == patient_id && !record.read)
            .count()
    }

    pub async fn get(&self, notification_id: Uuid) -> Result<NotificationRecord, SchedulingError> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|record| record.id == notification_id)
            .cloned()
            .ok_or_else(|| notification_not_found(notification_id))
    }

    pub async fn mark_read(&self, notification_id: Uuid) -> Result<NotificationRecord, SchedulingError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == notification_id)
            .ok_or_else(|| notification_not_found(notification_id))?;
        if record.read {
            return Ok(record.clone());
        }

        let updated = NotificationRecord { read: true, ..record.clone() };
        self.persist(&updated)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        *record = updated.clone();

        debug!("Notification {} marked read", notification_id);
        Ok(updated)
    }

    async fn emit(
        &self,
        patient_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: String,
        action_required: bool,
        appointment_id: Option<Uuid>,
    ) -> Result<NotificationRecord> {
        if patient_id.is_nil() {
            bail!("Notification '{}' has no recipient", title);
        }

        let record = NotificationRecord {
            id: Uuid::new_v4(),
            patient_id,
            notification_type,
            title: title.to_string(),
            message,
            timestamp: Utc::now(),
            read: false,
            action_required,
            appointment_id,
        };

        let mut records = self.records.write().await;
        self.persist(&record).await?;
        records.push(record.clone());

        info!(
            notification_id = %record.id,
            patient_id = %patient_id,
            "Notification emitted: {}", record.title
        );
        Ok(record)
    }

    async fn persist(&self, record: &NotificationRecord) -> Result<()> {
        let row = serde_json::to_value(record)?;
        self.store
            .upsert(NOTIFICATIONS_TABLE, vec![row])
            .await
            .map_err(|e| {
                warn!("Failed to store notification {}: {}", record.id, e);
                e
            })
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn on_booking(&self, appointment: &Appointment) -> Result<()> {
        NotificationService::on_booking(self, appointment).await.map(|_| ())
    }

    async fn on_cancellation(&self, appointment: &Appointment) -> Result<()> {
        NotificationService::on_cancellation(self, appointment).await.map(|_| ())
    }
}

fn notification_not_found(notification_id: Uuid) -> SchedulingError {
    SchedulingError::NotFound(format!("Notification {} not found", notification_id))
}
