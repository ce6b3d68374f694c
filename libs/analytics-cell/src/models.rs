use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::ChairId;
use doctor_cell::models::ApprovalCounts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChairUtilization {
    pub chair_id: ChairId,
    pub appointment_count: u32,
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProductivity {
    pub doctor_id: Uuid,
    pub doctor_name: Option<String>,
    pub appointment_count: u32,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub pending: usize,
    pub completed: usize,
    pub urgent: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total_appointments: usize,
    pub by_status: StatusCounts,
    /// Percent of appointments in range that are completed.
    pub completion_rate: f64,
    pub cancellation_rate: f64,
    pub emergency_count: usize,
    pub doctors: ApprovalCounts,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
