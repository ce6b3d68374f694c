// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::SchedulingError;

pub type ChairId = u32;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked slot. Times are naive clinic-local wall clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub chair_id: Option<ChairId>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub priority: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Cancelled rows are kept for history but never block a slot.
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn is_emergency(&self) -> bool {
        self.appointment_type == AppointmentType::Emergency
    }

    pub fn doctor_slot(&self) -> DoctorSlot {
        DoctorSlot {
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
        }
    }

    pub fn chair_slot(&self) -> Option<ChairSlot> {
        self.chair_id.map(|chair_id| ChairSlot {
            chair_id,
            date: self.date,
            time: self.time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoctorSlot {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChairSlot {
    pub chair_id: ChairId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Pending,
    Completed,
    Urgent,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Urgent => write!(f, "urgent"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = SchedulingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "pending" => Ok(AppointmentStatus::Pending),
            "completed" => Ok(AppointmentStatus::Completed),
            "urgent" => Ok(AppointmentStatus::Urgent),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(SchedulingError::Validation(format!(
                "Unknown appointment status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[serde(alias = "Routine")]
    Routine,
    #[serde(alias = "Emergency")]
    Emergency,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Routine => write!(f, "routine"),
            AppointmentType::Emergency => write!(f, "emergency"),
        }
    }
}

/// Triage level an admin can give instead of a raw priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn priority(self) -> i32 {
        match self {
            UrgencyLevel::Medium => 1,
            UrgencyLevel::High => 2,
            UrgencyLevel::Critical => 3,
        }
    }
}

// ==============================================================================
// CHAIR MODELS
// ==============================================================================

/// Chair status is derived from the ledger for a given slot; it is never
/// stored independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chair {
    pub id: ChairId,
    pub status: ChairStatus,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChairStatus {
    Available,
    Occupied,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub chair_id: Option<ChairId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: Option<i32>,
    pub urgency_level: Option<UrgencyLevel>,
    pub notes: Option<String>,
}

impl EmergencyRequest {
    /// An explicit priority wins over the urgency level.
    pub fn resolved_priority(&self) -> Result<i32, SchedulingError> {
        self.priority
            .or_else(|| self.urgency_level.map(UrgencyLevel::priority))
            .ok_or_else(|| {
                SchedulingError::Validation(
                    "Emergency insertion needs a priority or urgency_level".to_string(),
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// One row of a re-optimization batch. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignmentChange {
    pub appointment_id: Uuid,
    pub chair_id: Option<ChairId>,
    pub time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeDayRequest {
    pub changes: Vec<ReassignmentChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChairQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
}
