use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument};
use uuid::Uuid;

use appointment_cell::models::{AppointmentStatus, ChairId};
use appointment_cell::services::AppointmentLedger;
use doctor_cell::services::DoctorRegistry;
use shared_config::AppConfig;
use shared_models::error::SchedulingError;

use crate::models::{ChairUtilization, ClinicSummary, DoctorProductivity, StatusCounts};

/// Read-only reports over the ledger. Cancelled appointments never count
/// toward utilization or productivity.
pub struct AnalyticsService {
    ledger: Arc<AppointmentLedger>,
    registry: Arc<DoctorRegistry>,
    chair_daily_capacity: u32,
    doctor_daily_capacity: u32,
}

impl AnalyticsService {
    pub fn new(ledger: Arc<AppointmentLedger>, registry: Arc<DoctorRegistry>, config: &AppConfig) -> Self {
        Self {
            ledger,
            registry,
            chair_daily_capacity: config.chair_daily_capacity,
            doctor_daily_capacity: config.doctor_daily_capacity,
        }
    }

    /// Every chair in the pool, including idle ones.
    #[instrument(skip(self))]
    pub async fn chair_utilization(&self, date: NaiveDate) -> BTreeMap<ChairId, ChairUtilization> {
        let mut counts: BTreeMap<ChairId, u32> = self
            .ledger
            .chair_pool()
            .ids()
            .iter()
            .map(|&id| (id, 0))
            .collect();

        for appointment in self.ledger.list_for_date(date).await {
            if !appointment.is_active() {
                continue;
            }
            if let Some(chair_id) = appointment.chair_id {
                *counts.entry(chair_id).or_insert(0) += 1;
            }
        }

        debug!("Computed utilization for {} chairs on {}", counts.len(), date);

        counts
            .into_iter()
            .map(|(chair_id, appointment_count)| {
                (
                    chair_id,
                    ChairUtilization {
                        chair_id,
                        appointment_count,
                        utilization_rate: ratio(appointment_count, self.chair_daily_capacity),
                    },
                )
            })
            .collect()
    }

    /// Approved doctors plus anyone holding an appointment that day.
    #[instrument(skip(self))]
    pub async fn doctor_productivity(&self, date: NaiveDate) -> BTreeMap<Uuid, DoctorProductivity> {
        let mut counts: BTreeMap<Uuid, u32> = self
            .registry
            .list_approved()
            .await
            .into_iter()
            .map(|doctor| (doctor.id, 0))
            .collect();

        for appointment in self.ledger.list_for_date(date).await {
            if appointment.is_active() {
                *counts.entry(appointment.doctor_id).or_insert(0) += 1;
            }
        }

        let mut report = BTreeMap::new();
        for (doctor_id, appointment_count) in counts {
            let doctor_name = self.registry.get(doctor_id).await.ok().map(|d| d.name);
            report.insert(
                doctor_id,
                DoctorProductivity {
                    doctor_id,
                    doctor_name,
                    appointment_count,
                    productivity_score: ratio(appointment_count, self.doctor_daily_capacity),
                },
            );
        }
        report
    }

    /// Clinic-wide totals, optionally limited to an inclusive date range.
    #[instrument(skip(self))]
    pub async fn summary(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<ClinicSummary, SchedulingError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(SchedulingError::Validation(format!(
                    "Report range starts ({}) after it ends ({})",
                    from, to
                )));
            }
        }

        let appointments: Vec<_> = self
            .ledger
            .snapshot()
            .await
            .into_iter()
            .filter(|a| from.map_or(true, |from| a.date >= from))
            .filter(|a| to.map_or(true, |to| a.date <= to))
            .collect();

        let by_status = appointments
            .iter()
            .fold(StatusCounts::default(), |mut counts, appointment| {
                match appointment.status {
                    AppointmentStatus::Scheduled => counts.scheduled += 1,
                    AppointmentStatus::Pending => counts.pending += 1,
                    AppointmentStatus::Completed => counts.completed += 1,
                    AppointmentStatus::Urgent => counts.urgent += 1,
                    AppointmentStatus::Cancelled => counts.cancelled += 1,
                }
                counts
            });

        let total = appointments.len();
        let percent = |n: usize| if total == 0 { 0.0 } else { n as f64 * 100.0 / total as f64 };

        Ok(ClinicSummary {
            from,
            to,
            total_appointments: total,
            completion_rate: percent(by_status.completed),
            cancellation_rate: percent(by_status.cancelled),
            emergency_count: appointments.iter().filter(|a| a.is_emergency()).count(),
            by_status,
            doctors: self.registry.approval_counts().await,
        })
    }
}

fn ratio(count: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(capacity)
    }
}
