// libs/appointment-cell/src/services/ledger.rs
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorRegistry;
use shared_database::{MemoryTableStore, TableStore};
use shared_models::error::SchedulingError;

use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, BookAppointmentRequest, Chair, ChairId,
    ChairSlot, ChairStatus, DoctorSlot, EmergencyRequest, ReassignmentChange,
};
use crate::services::chairs::ChairPool;

pub const APPOINTMENTS_TABLE: &str = "appointments";

// ==============================================================================
// LEDGER STATE
// ==============================================================================

/// Appointment rows plus the two slot indexes that play the role of unique
/// constraints over non-cancelled rows. Only active appointments are indexed.
#[derive(Default)]
struct LedgerState {
    appointments: HashMap<Uuid, Appointment>,
    doctor_slots: HashMap<DoctorSlot, Vec<Uuid>>,
    chair_slots: HashMap<ChairSlot, Uuid>,
}

impl LedgerState {
    /// Rebuild indexes for a full set of rows, failing if any chair slot is
    /// held twice or any doctor slot holds more than one routine booking.
    /// These are the same two rules every single-row write enforces.
    fn rebuild(appointments: HashMap<Uuid, Appointment>) -> Result<Self, SchedulingError> {
        let mut active: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut state = LedgerState {
            appointments,
            ..LedgerState::default()
        };

        for appointment in &active {
            if let Some(slot) = appointment.chair_slot() {
                if let Some(holder) = state.chair_holder(&slot) {
                    return Err(SchedulingError::Conflict(format!(
                        "Chair {} on {} at {} would be held by both {} and {}",
                        slot.chair_id, slot.date, slot.time, holder, appointment.id
                    )));
                }
            }

            if appointment.appointment_type == AppointmentType::Routine {
                if let Some(holder) = state.routine_holder(&appointment.doctor_slot()) {
                    return Err(SchedulingError::Conflict(format!(
                        "Doctor {} on {} at {} would be booked by both {} and {}",
                        appointment.doctor_id, appointment.date, appointment.time, holder, appointment.id
                    )));
                }
            }

            state.index(appointment);
        }

        Ok(state)
    }

    /// The active routine appointment holding the doctor slot, if any.
    /// Emergencies sharing the slot do not count.
    fn routine_holder(&self, slot: &DoctorSlot) -> Option<Uuid> {
        self.doctor_slots
            .get(slot)
            .into_iter()
            .flatten()
            .copied()
            .find(|id| {
                self.appointments
                    .get(id)
                    .map(|other| other.appointment_type == AppointmentType::Routine)
                    .unwrap_or(false)
            })
    }

    fn chair_holder(&self, slot: &ChairSlot) -> Option<Uuid> {
        self.chair_slots.get(slot).copied()
    }

    fn index(&mut self, appointment: &Appointment) {
        if !appointment.is_active() {
            return;
        }
        self.doctor_slots
            .entry(appointment.doctor_slot())
            .or_default()
            .push(appointment.id);
        if let Some(slot) = appointment.chair_slot() {
            self.chair_slots.insert(slot, appointment.id);
        }
    }

    fn unindex(&mut self, appointment: &Appointment) {
        let doctor_slot = appointment.doctor_slot();
        if let Some(ids) = self.doctor_slots.get_mut(&doctor_slot) {
            ids.retain(|id| *id != appointment.id);
            if ids.is_empty() {
                self.doctor_slots.remove(&doctor_slot);
            }
        }
        if let Some(slot) = appointment.chair_slot() {
            if self.chair_slots.get(&slot) == Some(&appointment.id) {
                self.chair_slots.remove(&slot);
            }
        }
    }

    fn insert(&mut self, appointment: Appointment) {
        self.index(&appointment);
        self.appointments.insert(appointment.id, appointment);
    }

    fn replace(&mut self, updated: Appointment) {
        if let Some(previous) = self.appointments.remove(&updated.id) {
            self.unindex(&previous);
        }
        self.insert(updated);
    }
}

// ==============================================================================
// APPOINTMENT LEDGER
// ==============================================================================

/// Result of a status write. `changed` is false when the appointment
/// already had the requested status and nothing was written.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub appointment: Appointment,
    pub changed: bool,
}

/// Authoritative store of appointments and the arbiter of slot conflicts.
///
/// Every mutation runs its check-then-write under the ledger's write lock,
/// so two requests racing for the same doctor or chair slot cannot both
/// commit; the loser sees `SchedulingError::Conflict`. Rows are written to
/// the `appointments` table before the in-memory indexes change, and a
/// failed write leaves the ledger as it was.
pub struct AppointmentLedger {
    registry: Arc<DoctorRegistry>,
    chairs: ChairPool,
    store: Arc<dyn TableStore>,
    state: RwLock<LedgerState>,
}

impl AppointmentLedger {
    /// Empty ledger over a process-local store.
    pub fn new(registry: Arc<DoctorRegistry>, chairs: ChairPool) -> Self {
        Self::with_store(registry, chairs, Arc::new(MemoryTableStore::new()))
    }

    pub fn with_store(registry: Arc<DoctorRegistry>, chairs: ChairPool, store: Arc<dyn TableStore>) -> Self {
        Self {
            registry,
            chairs,
            store,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Ledger holding every appointment already in the store, cancelled
    /// history included. Stored rows that break a slot rule are refused.
    pub async fn load(
        registry: Arc<DoctorRegistry>,
        chairs: ChairPool,
        store: Arc<dyn TableStore>,
    ) -> anyhow::Result<Self> {
        let rows = store.load(APPOINTMENTS_TABLE).await?;
        let appointments = rows
            .into_iter()
            .map(|row| serde_json::from_value::<Appointment>(row).map(|a| (a.id, a)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        let state = LedgerState::rebuild(appointments)
            .map_err(|e| anyhow!("Stored appointments are inconsistent: {}", e))?;
        info!("Loaded {} appointments", state.appointments.len());

        Ok(Self {
            registry,
            chairs,
            store,
            state: RwLock::new(state),
        })
    }

    pub fn chair_pool(&self) -> &ChairPool {
        &self.chairs
    }

    pub fn registry(&self) -> &Arc<DoctorRegistry> {
        &self.registry
    }

    // ==========================================================================
    // RESOURCE POOL
    // ==========================================================================

    /// Lowest-id chair with no active appointment at the slot.
    pub async fn find_available(&self, date: NaiveDate, time: NaiveTime) -> Option<ChairId> {
        let state = self.state.read().await;
        self.first_free_chair(&state, date, time)
    }

    /// Chair availability is derived from active appointments, so releasing
    /// a chair needs no write; this only validates the chair and logs.
    pub async fn release(&self, chair_id: ChairId, date: NaiveDate, time: NaiveTime) -> Result<(), SchedulingError> {
        self.ensure_chair_exists(chair_id)?;
        let state = self.state.read().await;
        match state.chair_holder(&ChairSlot { chair_id, date, time }) {
            Some(holder) => debug!(
                "Chair {} on {} at {} still held by appointment {}; cancel it to free the slot",
                chair_id, date, time, holder
            ),
            None => debug!("Chair {} on {} at {} is free", chair_id, date, time),
        }
        Ok(())
    }

    /// Every chair with its derived status at the slot.
    pub async fn chair_statuses(&self, date: NaiveDate, time: NaiveTime) -> Vec<Chair> {
        let state = self.state.read().await;
        self.chairs
            .ids()
            .iter()
            .map(|&id| {
                let holder = state.chair_holder(&ChairSlot { chair_id: id, date, time });
                Chair {
                    id,
                    status: if holder.is_some() { ChairStatus::Occupied } else { ChairStatus::Available },
                    appointment_id: holder,
                }
            })
            .collect()
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    /// Book a routine appointment, assigning the lowest free chair unless
    /// one is requested. A doctor holds at most one routine booking per
    /// slot; emergencies seated in the same slot do not block it.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, date = %request.date, time = %request.time))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<Appointment, SchedulingError> {
        ensure_patient(request.patient_id)?;
        self.registry.ensure_schedulable(request.doctor_id).await?;
        if let Some(chair_id) = request.chair_id {
            self.ensure_chair_exists(chair_id)?;
        }

        let mut state = self.state.write().await;

        let doctor_slot = DoctorSlot {
            doctor_id: request.doctor_id,
            date: request.date,
            time: request.time,
        };
        if state.routine_holder(&doctor_slot).is_some() {
            warn!("Doctor {} already booked on {} at {}", request.doctor_id, request.date, request.time);
            return Err(SchedulingError::Conflict(format!(
                "Doctor {} is already booked on {} at {}",
                request.doctor_id, request.date, request.time
            )));
        }

        let chair_id = match request.chair_id {
            Some(chair_id) => {
                let slot = ChairSlot { chair_id, date: request.date, time: request.time };
                if state.chair_holder(&slot).is_some() {
                    warn!("Chair {} already taken on {} at {}", chair_id, request.date, request.time);
                    return Err(SchedulingError::Conflict(format!(
                        "Chair {} is already taken on {} at {}",
                        chair_id, request.date, request.time
                    )));
                }
                chair_id
            }
            None => self
                .first_free_chair(&state, request.date, request.time)
                .ok_or_else(|| {
                    SchedulingError::Conflict(format!(
                        "Every chair is taken on {} at {}",
                        request.date, request.time
                    ))
                })?,
        };

        let appointment = new_appointment(
            request.patient_id,
            request.doctor_id,
            chair_id,
            request.date,
            request.time,
            AppointmentType::Routine,
            None,
            None,
        );
        self.persist(std::slice::from_ref(&appointment)).await?;
        state.insert(appointment.clone());

        info!("Booked appointment {} in chair {}", appointment.id, chair_id);
        Ok(appointment)
    }

    /// Commit an emergency case into the first free chair. Only the chair
    /// slot is checked: an emergency may be seen by a doctor who already has
    /// a booking at that time. No routine booking is displaced; with every
    /// chair taken the insertion fails with `NoCapacity`.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, date = %request.date, time = %request.time))]
    pub async fn insert_emergency(&self, request: &EmergencyRequest, priority: i32) -> Result<Appointment, SchedulingError> {
        ensure_patient(request.patient_id)?;
        self.registry.ensure_schedulable(request.doctor_id).await?;

        let mut state = self.state.write().await;

        let chair_id = self
            .first_free_chair(&state, request.date, request.time)
            .ok_or(SchedulingError::NoCapacity {
                date: request.date,
                time: request.time,
            })?;

        let appointment = new_appointment(
            request.patient_id,
            request.doctor_id,
            chair_id,
            request.date,
            request.time,
            AppointmentType::Emergency,
            Some(priority),
            request.notes.clone(),
        );
        self.persist(std::slice::from_ref(&appointment)).await?;
        state.insert(appointment.clone());

        info!(
            "Inserted emergency appointment {} (priority {}) in chair {}",
            appointment.id, priority, chair_id
        );
        Ok(appointment)
    }

    /// Set the status from its textual form; unknown values are rejected.
    pub async fn update_status(&self, appointment_id: Uuid, new_status: &str) -> Result<Appointment, SchedulingError> {
        let status: AppointmentStatus = new_status.parse()?;
        Ok(self.set_status(appointment_id, status).await?.appointment)
    }

    /// Cancelled rows stay in the ledger; their slots become free.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        Ok(self
            .set_status(appointment_id, AppointmentStatus::Cancelled)
            .await?
            .appointment)
    }

    /// Move an appointment to `status`, reporting whether anything changed.
    #[instrument(skip(self))]
    pub async fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<StatusChange, SchedulingError> {
        let mut state = self.state.write().await;

        let current = state
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or_else(|| appointment_not_found(appointment_id))?;

        if current.status == status {
            debug!("Appointment {} already {}", appointment_id, status);
            return Ok(StatusChange {
                appointment: current,
                changed: false,
            });
        }

        let mut updated = current.clone();
        updated.status = status;
        updated.updated_at = Utc::now();

        // Reviving a cancelled row must not double-book its old slot
        if !current.is_active() && updated.is_active() {
            if let Some(slot) = updated.chair_slot() {
                if state.chair_holder(&slot).is_some() {
                    return Err(SchedulingError::Conflict(format!(
                        "Chair {} on {} at {} has been rebooked",
                        slot.chair_id, slot.date, slot.time
                    )));
                }
            }
            if updated.appointment_type == AppointmentType::Routine
                && state.routine_holder(&updated.doctor_slot()).is_some()
            {
                return Err(SchedulingError::Conflict(format!(
                    "Doctor {} on {} at {} has been rebooked",
                    updated.doctor_id, updated.date, updated.time
                )));
            }
        }

        self.persist(std::slice::from_ref(&updated)).await?;
        state.replace(updated.clone());

        info!("Appointment {} status {} -> {}", appointment_id, current.status, status);
        Ok(StatusChange {
            appointment: updated,
            changed: true,
        })
    }

    /// Apply every change or none. An unknown appointment or chair, or a
    /// batch that would leave a slot double-booked, rejects the whole batch
    /// and leaves the ledger untouched.
    #[instrument(skip(self, changes), fields(changes = changes.len()))]
    pub async fn bulk_reassign(&self, changes: &[ReassignmentChange]) -> Result<Vec<Appointment>, SchedulingError> {
        let mut state = self.state.write().await;

        let mut draft = state.appointments.clone();
        let now = Utc::now();
        let mut touched: Vec<Uuid> = Vec::with_capacity(changes.len());

        for change in changes {
            let appointment = draft.get_mut(&change.appointment_id).ok_or_else(|| {
                warn!("Re-optimization batch names unknown appointment {}", change.appointment_id);
                SchedulingError::NotFound(format!(
                    "Appointment {} not found; no changes were applied",
                    change.appointment_id
                ))
            })?;

            if let Some(chair_id) = change.chair_id {
                if !self.chairs.contains(chair_id) {
                    return Err(SchedulingError::NotFound(format!(
                        "Chair {} not found; no changes were applied",
                        chair_id
                    )));
                }
                appointment.chair_id = Some(chair_id);
            }
            if let Some(time) = change.time {
                appointment.time = time;
            }
            if let Some(status) = change.status {
                appointment.status = status;
            }
            appointment.updated_at = now;

            if !touched.contains(&change.appointment_id) {
                touched.push(change.appointment_id);
            }
        }

        let rebuilt = LedgerState::rebuild(draft)?;
        let updated: Vec<Appointment> = touched
            .iter()
            .filter_map(|id| rebuilt.appointments.get(id).cloned())
            .collect();

        // One write for the whole batch
        self.persist(&updated).await?;
        *state = rebuilt;

        info!("Applied re-optimization batch of {} changes", changes.len());
        Ok(updated)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let state = self.state.read().await;
        state
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or_else(|| appointment_not_found(appointment_id))
    }

    pub async fn list_by_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        self.list_where(|a| a.doctor_id == doctor_id).await
    }

    pub async fn list_by_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        self.list_where(|a| a.patient_id == patient_id).await
    }

    /// The doctor's active appointments on `today`.
    pub async fn list_today_by_doctor(&self, doctor_id: Uuid, today: NaiveDate) -> Vec<Appointment> {
        self.list_where(|a| a.doctor_id == doctor_id && a.date == today && a.is_active())
            .await
    }

    pub async fn list_for_date(&self, date: NaiveDate) -> Vec<Appointment> {
        self.list_where(|a| a.date == date).await
    }

    /// Active emergencies, most urgent first.
    pub async fn list_emergencies(&self) -> Vec<Appointment> {
        let mut emergencies = self.list_where(|a| a.is_emergency() && a.is_active()).await;
        emergencies.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.date.cmp(&b.date))
                .then(a.time.cmp(&b.time))
        });
        emergencies
    }

    /// Every appointment, including cancelled history.
    pub async fn snapshot(&self) -> Vec<Appointment> {
        self.list_where(|_| true).await
    }

    async fn list_where<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| predicate(*a))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.time.cmp(&b.time))
                .then(a.created_at.cmp(&b.created_at))
        });
        appointments
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn persist(&self, appointments: &[Appointment]) -> Result<(), SchedulingError> {
        let rows = appointments
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;

        self.store.upsert(APPOINTMENTS_TABLE, rows).await.map_err(|e| {
            warn!("Failed to store {} appointment rows: {}", appointments.len(), e);
            SchedulingError::Storage(e.to_string())
        })
    }

    fn first_free_chair(&self, state: &LedgerState, date: NaiveDate, time: NaiveTime) -> Option<ChairId> {
        self.chairs
            .first_available(|chair_id| state.chair_holder(&ChairSlot { chair_id, date, time }).is_some())
    }

    fn ensure_chair_exists(&self, chair_id: ChairId) -> Result<(), SchedulingError> {
        if self.chairs.contains(chair_id) {
            Ok(())
        } else {
            Err(SchedulingError::NotFound(format!("Chair {} not found", chair_id)))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn new_appointment(
    patient_id: Uuid,
    doctor_id: Uuid,
    chair_id: ChairId,
    date: NaiveDate,
    time: NaiveTime,
    appointment_type: AppointmentType,
    priority: Option<i32>,
    notes: Option<String>,
) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        chair_id: Some(chair_id),
        date,
        time,
        status: AppointmentStatus::Scheduled,
        appointment_type,
        priority,
        notes,
        created_at: now,
        updated_at: now,
    }
}

fn ensure_patient(patient_id: Uuid) -> Result<(), SchedulingError> {
    if patient_id.is_nil() {
        Err(SchedulingError::Validation("A patient id is required".to_string()))
    } else {
        Ok(())
    }
}

fn appointment_not_found(appointment_id: Uuid) -> SchedulingError {
    SchedulingError::NotFound(format!("Appointment {} not found", appointment_id))
}
