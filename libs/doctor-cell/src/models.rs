use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub contact: String,
    pub approval_state: ApprovalState,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_schedulable(&self) -> bool {
        self.approval_state == ApprovalState::Approved
    }
}

/// Credentialing state. Only `Approved` doctors may receive new bookings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[serde(alias = "pending")]
    PendingApproval,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalState::PendingApproval => write!(f, "pending_approval"),
            ApprovalState::Approved => write!(f, "approved"),
            ApprovalState::Rejected => write!(f, "rejected"),
        }
    }
}

// Fields default to empty so that missing values surface as validation
// errors from the registry rather than as JSON rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterDoctorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectDoctorRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApprovalCounts {
    pub pending_approval: usize,
    pub approved: usize,
    pub rejected: usize,
}
