use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::{MemoryTableStore, TableStore};
use shared_models::error::SchedulingError;

use crate::models::{ApprovalCounts, ApprovalState, Doctor, RegisterDoctorRequest};

const DEFAULT_REJECTION_REASON: &str = "Application rejected by administrator";
pub const DOCTORS_TABLE: &str = "doctors";

fn contact_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\+?[0-9][0-9 \-]{5,19}|[^@\s]+@[^@\s]+\.[^@\s]+)$")
            .expect("contact pattern is valid")
    })
}

struct RegisteredDoctor {
    // Registration order; breaks ties between equal timestamps.
    seq: u64,
    doctor: Doctor,
}

#[derive(Default)]
struct RegistryState {
    doctors: HashMap<Uuid, RegisteredDoctor>,
    next_seq: u64,
}

impl RegistryState {
    fn insert(&mut self, doctor: Doctor) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.doctors.insert(doctor.id, RegisteredDoctor { seq, doctor });
    }
}

/// Holds doctor records and their approval state. Every change is written
/// to the `doctors` table before it becomes visible here.
pub struct DoctorRegistry {
    store: Arc<dyn TableStore>,
    state: RwLock<RegistryState>,
}

impl Default for DoctorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DoctorRegistry {
    /// Empty registry over a process-local store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryTableStore::new()))
    }

    pub fn with_store(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Registry holding every doctor already in the store.
    pub async fn load(store: Arc<dyn TableStore>) -> anyhow::Result<Self> {
        let rows = store.load(DOCTORS_TABLE).await?;
        let mut doctors = rows
            .into_iter()
            .map(serde_json::from_value::<Doctor>)
            .collect::<Result<Vec<_>, _>>()?;
        doctors.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut state = RegistryState::default();
        for doctor in doctors {
            state.insert(doctor);
        }
        info!("Loaded {} doctors", state.doctors.len());

        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    /// Create a doctor in `PendingApproval`.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register(&self, request: RegisterDoctorRequest) -> Result<Uuid, SchedulingError> {
        let name = request.name.trim();
        let specialty = request.specialty.trim();
        let contact = request.contact.trim();

        if name.is_empty() {
            return Err(SchedulingError::Validation("Doctor name is required".to_string()));
        }
        if specialty.is_empty() {
            return Err(SchedulingError::Validation("Doctor specialty is required".to_string()));
        }
        if !contact_pattern().is_match(contact) {
            return Err(SchedulingError::Validation(format!(
                "Doctor contact '{}' is not a phone number or email address",
                contact
            )));
        }

        let now = Utc::now();
        let doctor = Doctor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            specialty: specialty.to_string(),
            contact: contact.to_string(),
            approval_state: ApprovalState::PendingApproval,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        let doctor_id = doctor.id;

        let mut state = self.state.write().await;
        self.persist(&doctor).await?;
        state.insert(doctor);

        info!("Registered doctor {} pending approval", doctor_id);
        Ok(doctor_id)
    }

    /// PendingApproval or Rejected -> Approved. Idempotent when already approved.
    #[instrument(skip(self))]
    pub async fn approve(&self, doctor_id: Uuid) -> Result<Doctor, SchedulingError> {
        let mut state = self.state.write().await;
        let entry = state
            .doctors
            .get_mut(&doctor_id)
            .ok_or_else(|| doctor_not_found(doctor_id))?;

        if entry.doctor.approval_state == ApprovalState::Approved {
            debug!("Doctor {} already approved", doctor_id);
            return Ok(entry.doctor.clone());
        }

        let mut updated = entry.doctor.clone();
        updated.approval_state = ApprovalState::Approved;
        updated.rejection_reason = None;
        updated.updated_at = Utc::now();

        self.persist(&updated).await?;
        entry.doctor = updated.clone();

        info!("Doctor {} approved", doctor_id);
        Ok(updated)
    }

    /// Any state -> Rejected. Existing appointments are left untouched.
    #[instrument(skip(self, reason))]
    pub async fn reject(&self, doctor_id: Uuid, reason: Option<String>) -> Result<Doctor, SchedulingError> {
        let mut state = self.state.write().await;
        let entry = state
            .doctors
            .get_mut(&doctor_id)
            .ok_or_else(|| doctor_not_found(doctor_id))?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        if entry.doctor.approval_state == ApprovalState::Approved {
            warn!("Rejecting previously approved doctor {}", doctor_id);
        }

        let mut updated = entry.doctor.clone();
        updated.approval_state = ApprovalState::Rejected;
        updated.rejection_reason = Some(reason);
        updated.updated_at = Utc::now();

        self.persist(&updated).await?;
        entry.doctor = updated.clone();

        info!("Doctor {} rejected", doctor_id);
        Ok(updated)
    }

    pub async fn get(&self, doctor_id: Uuid) -> Result<Doctor, SchedulingError> {
        let state = self.state.read().await;
        state
            .doctors
            .get(&doctor_id)
            .map(|entry| entry.doctor.clone())
            .ok_or_else(|| doctor_not_found(doctor_id))
    }

    /// True iff the doctor exists and is approved.
    pub async fn is_schedulable(&self, doctor_id: Uuid) -> bool {
        let state = self.state.read().await;
        state
            .doctors
            .get(&doctor_id)
            .map(|entry| entry.doctor.is_schedulable())
            .unwrap_or(false)
    }

    /// Booking gate: NotFound for unknown doctors, NotSchedulable for
    /// doctors not in `Approved`.
    pub async fn ensure_schedulable(&self, doctor_id: Uuid) -> Result<(), SchedulingError> {
        let doctor = self.get(doctor_id).await?;
        if doctor.is_schedulable() {
            Ok(())
        } else {
            debug!("Doctor {} is {} and cannot take bookings", doctor_id, doctor.approval_state);
            Err(SchedulingError::NotSchedulable(doctor_id))
        }
    }

    /// Pending doctors, most recent registration first.
    pub async fn list_pending(&self) -> Vec<Doctor> {
        self.list_where(|doctor| doctor.approval_state == ApprovalState::PendingApproval)
            .await
    }

    /// Every doctor (admin view), most recent registration first.
    pub async fn list_all(&self) -> Vec<Doctor> {
        self.list_where(|_| true).await
    }

    /// Doctors patients may book with, by name.
    pub async fn list_approved(&self) -> Vec<Doctor> {
        let mut doctors = self.list_where(Doctor::is_schedulable).await;
        doctors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        doctors
    }

    pub async fn approval_counts(&self) -> ApprovalCounts {
        let state = self.state.read().await;
        state
            .doctors
            .values()
            .fold(ApprovalCounts::default(), |mut counts, entry| {
                match entry.doctor.approval_state {
                    ApprovalState::PendingApproval => counts.pending_approval += 1,
                    ApprovalState::Approved => counts.approved += 1,
                    ApprovalState::Rejected => counts.rejected += 1,
                }
                counts
            })
    }

    async fn persist(&self, doctor: &Doctor) -> Result<(), SchedulingError> {
        let row = doctor_row(doctor)?;
        self.store.upsert(DOCTORS_TABLE, vec![row]).await.map_err(|e| {
            warn!("Failed to store doctor {}: {}", doctor.id, e);
            SchedulingError::Storage(e.to_string())
        })
    }

    async fn list_where<F>(&self, predicate: F) -> Vec<Doctor>
    where
        F: Fn(&Doctor) -> bool,
    {
        let state = self.state.read().await;
        let mut entries: Vec<&RegisteredDoctor> = state
            .doctors
            .values()
            .filter(|entry| predicate(&entry.doctor))
            .collect();

        entries.sort_by(|a, b| {
            b.doctor
                .created_at
                .cmp(&a.doctor.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        entries.into_iter().map(|entry| entry.doctor.clone()).collect()
    }
}

fn doctor_row(doctor: &Doctor) -> Result<Value, SchedulingError> {
    serde_json::to_value(doctor).map_err(|e| SchedulingError::Storage(e.to_string()))
}

fn doctor_not_found(doctor_id: Uuid) -> SchedulingError {
    SchedulingError::NotFound(format!("Doctor {} not found", doctor_id))
}
