// libs/appointment-cell/src/services/scheduler.rs
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_models::error::SchedulingError;

use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest, EmergencyRequest, ReassignmentChange};
use crate::services::ledger::{AppointmentLedger, StatusChange};

/// Receiver for patient-facing notices about committed appointments.
/// Emission is advisory: an error here never undoes the ledger write.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn on_booking(&self, appointment: &Appointment) -> anyhow::Result<()>;

    async fn on_cancellation(&self, appointment: &Appointment) -> anyhow::Result<()>;
}

/// Booking policy on top of the ledger: routine bookings, emergency
/// insertion and day re-optimization. The ledger validates and commits;
/// the scheduler resolves priorities and fans out notifications.
pub struct SchedulerService {
    ledger: Arc<AppointmentLedger>,
    notifier: Arc<dyn NotificationSink>,
}

impl SchedulerService {
    pub fn new(ledger: Arc<AppointmentLedger>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { ledger, notifier }
    }

    pub fn ledger(&self) -> &Arc<AppointmentLedger> {
        &self.ledger
    }

    pub async fn book_routine(&self, request: BookAppointmentRequest) -> Result<Appointment, SchedulingError> {
        let appointment = self.ledger.book(request).await?;
        self.notify_booking(&appointment).await;
        Ok(appointment)
    }

    /// Seat an emergency case in the first free chair at the slot.
    /// Lower-priority routine bookings are never displaced.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    pub async fn insert_emergency(&self, request: EmergencyRequest) -> Result<Appointment, SchedulingError> {
        let priority = request.resolved_priority()?;

        let appointment = match self.ledger.insert_emergency(&request, priority).await {
            Ok(appointment) => appointment,
            Err(SchedulingError::NoCapacity { date, time }) => {
                warn!("No chair free for emergency on {} at {}", date, time);
                return Err(SchedulingError::NoCapacity { date, time });
            }
            Err(e) => return Err(e),
        };

        self.notify_booking(&appointment).await;
        Ok(appointment)
    }

    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let change = self
            .ledger
            .set_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;
        self.notify_transition(&change).await;
        Ok(change.appointment)
    }

    pub async fn update_status(&self, appointment_id: Uuid, new_status: &str) -> Result<Appointment, SchedulingError> {
        let status: AppointmentStatus = new_status.parse()?;
        let change = self.ledger.set_status(appointment_id, status).await?;
        self.notify_transition(&change).await;
        Ok(change.appointment)
    }

    /// Apply caller-supplied chair/time/status assignments for a day as one
    /// atomic batch.
    #[instrument(skip(self, changes), fields(changes = changes.len()))]
    pub async fn optimize_day(&self, changes: Vec<ReassignmentChange>) -> Result<Vec<Appointment>, SchedulingError> {
        let updated = self.ledger.bulk_reassign(&changes).await?;
        info!("Re-optimization updated {} appointments", updated.len());
        Ok(updated)
    }

    /// Only real transitions reach the patient; re-sending the current
    /// status is silent.
    async fn notify_transition(&self, change: &StatusChange) {
        if !change.changed {
            return;
        }

        let appointment = &change.appointment;
        match appointment.status {
            AppointmentStatus::Cancelled => self.notify_cancellation(appointment).await,
            AppointmentStatus::Scheduled | AppointmentStatus::Pending => self.notify_booking(appointment).await,
            AppointmentStatus::Completed | AppointmentStatus::Urgent => {}
        }
    }

    async fn notify_booking(&self, appointment: &Appointment) {
        if let Err(e) = self.notifier.on_booking(appointment).await {
            warn!("Booking notification for appointment {} failed: {}", appointment.id, e);
        }
    }

    async fn notify_cancellation(&self, appointment: &Appointment) {
        if let Err(e) = self.notifier.on_cancellation(appointment).await {
            warn!("Cancellation notification for appointment {} failed: {}", appointment.id, e);
        }
    }
}
