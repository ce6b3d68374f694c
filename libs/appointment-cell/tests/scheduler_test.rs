// libs/appointment-cell/tests/scheduler_test.rs

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, AppointmentType, BookAppointmentRequest, EmergencyRequest,
    ReassignmentChange, UrgencyLevel,
};
use appointment_cell::services::{AppointmentLedger, ChairPool, NotificationSink, SchedulerService};
use doctor_cell::models::RegisterDoctorRequest;
use doctor_cell::services::DoctorRegistry;
use shared_models::error::SchedulingError;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(&'static str, Uuid)>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<(&'static str, Uuid)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn on_booking(&self, appointment: &Appointment) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(("booking", appointment.id));
        Ok(())
    }

    async fn on_cancellation(&self, appointment: &Appointment) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(("cancellation", appointment.id));
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn on_booking(&self, _appointment: &Appointment) -> anyhow::Result<()> {
        Err(anyhow!("notification store unavailable"))
    }

    async fn on_cancellation(&self, _appointment: &Appointment) -> anyhow::Result<()> {
        Err(anyhow!("notification store unavailable"))
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn nine() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn scheduler_with(chairs: u32, sink: Arc<dyn NotificationSink>) -> (Arc<DoctorRegistry>, SchedulerService) {
    let registry = Arc::new(DoctorRegistry::new());
    let ledger = Arc::new(AppointmentLedger::new(registry.clone(), ChairPool::new(chairs)));
    (registry, SchedulerService::new(ledger, sink))
}

async fn register(registry: &DoctorRegistry, name: &str) -> Uuid {
    registry
        .register(RegisterDoctorRequest {
            name: name.to_string(),
            specialty: "Oral Surgery".to_string(),
            contact: "+91 98450 11223".to_string(),
        })
        .await
        .unwrap()
}

fn routine(doctor_id: Uuid) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: Uuid::new_v4(),
        doctor_id,
        date: day(),
        time: nine(),
        chair_id: None,
    }
}

fn emergency(doctor_id: Uuid, priority: i32) -> EmergencyRequest {
    EmergencyRequest {
        patient_id: Uuid::new_v4(),
        doctor_id,
        date: day(),
        time: nine(),
        priority: Some(priority),
        urgency_level: None,
        notes: None,
    }
}

#[tokio::test]
async fn approval_booking_and_emergency_scenario() {
    let sink = Arc::new(RecordingSink::default());
    let (registry, scheduler) = scheduler_with(3, sink.clone());

    let d1 = register(&registry, "Dr. One").await;
    assert_matches!(
        scheduler.book_routine(routine(d1)).await,
        Err(SchedulingError::NotSchedulable(_))
    );

    registry.approve(d1).await.unwrap();
    let first = scheduler.book_routine(routine(d1)).await.unwrap();
    assert_eq!(first.chair_id, Some(1));

    assert_matches!(
        scheduler.book_routine(routine(d1)).await,
        Err(SchedulingError::Conflict(_))
    );

    // Fill the remaining chairs with other doctors
    let d2 = register(&registry, "Dr. Two").await;
    let d3 = register(&registry, "Dr. Three").await;
    registry.approve(d2).await.unwrap();
    registry.approve(d3).await.unwrap();
    let blocker = scheduler.book_routine(routine(d2)).await.unwrap();
    scheduler.book_routine(routine(d3)).await.unwrap();

    assert_matches!(
        scheduler.insert_emergency(emergency(d1, 4)).await,
        Err(SchedulingError::NoCapacity { .. })
    );

    scheduler.cancel(blocker.id).await.unwrap();

    let urgent = scheduler.insert_emergency(emergency(d1, 4)).await.unwrap();
    assert_eq!(urgent.chair_id, Some(2));
    assert_eq!(urgent.appointment_type, AppointmentType::Emergency);
    assert_eq!(urgent.priority, Some(4));
    assert_eq!(urgent.status, AppointmentStatus::Scheduled);

    let events = sink.events();
    assert_eq!(events.first(), Some(&("booking", first.id)));
    assert!(events.contains(&("cancellation", blocker.id)));
    assert_eq!(events.last(), Some(&("booking", urgent.id)));
}

#[tokio::test]
async fn emergency_priority_comes_from_urgency_level() {
    let (registry, scheduler) = scheduler_with(2, Arc::new(RecordingSink::default()));
    let doctor = register(&registry, "Dr. Triage").await;
    registry.approve(doctor).await.unwrap();

    let mut request = emergency(doctor, 0);
    request.priority = None;
    request.urgency_level = Some(UrgencyLevel::High);
    let appointment = scheduler.insert_emergency(request).await.unwrap();
    assert_eq!(appointment.priority, Some(2));

    let mut missing = emergency(doctor, 0);
    missing.priority = None;
    assert_matches!(
        scheduler.insert_emergency(missing).await,
        Err(SchedulingError::Validation(_))
    );
}

#[tokio::test]
async fn emergency_for_unapproved_doctor_is_refused() {
    let (registry, scheduler) = scheduler_with(2, Arc::new(RecordingSink::default()));
    let doctor = register(&registry, "Dr. Waiting").await;

    assert_matches!(
        scheduler.insert_emergency(emergency(doctor, 3)).await,
        Err(SchedulingError::NotSchedulable(_))
    );
}

#[tokio::test]
async fn notification_failure_does_not_roll_back_the_booking() {
    let (registry, scheduler) = scheduler_with(2, Arc::new(FailingSink));
    let doctor = register(&registry, "Dr. Quiet").await;
    registry.approve(doctor).await.unwrap();

    let appointment = scheduler.book_routine(routine(doctor)).await.unwrap();
    assert!(scheduler.ledger().get(appointment.id).await.is_ok());

    let cancelled = scheduler.cancel(appointment.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn status_updates_notify_by_outcome() {
    let sink = Arc::new(RecordingSink::default());
    let (registry, scheduler) = scheduler_with(2, sink.clone());
    let doctor = register(&registry, "Dr. Status").await;
    registry.approve(doctor).await.unwrap();

    let appointment = scheduler.book_routine(routine(doctor)).await.unwrap();
    scheduler.update_status(appointment.id, "completed").await.unwrap();
    scheduler.update_status(appointment.id, "cancelled").await.unwrap();

    assert_eq!(
        sink.events(),
        vec![("booking", appointment.id), ("cancellation", appointment.id)]
    );
}

#[tokio::test]
async fn repeated_status_is_not_announced_twice() {
    let sink = Arc::new(RecordingSink::default());
    let (registry, scheduler) = scheduler_with(2, sink.clone());
    let doctor = register(&registry, "Dr. Echo").await;
    registry.approve(doctor).await.unwrap();

    let appointment = scheduler.book_routine(routine(doctor)).await.unwrap();
    let unchanged = scheduler.update_status(appointment.id, "scheduled").await.unwrap();
    assert_eq!(unchanged.status, AppointmentStatus::Scheduled);

    scheduler.cancel(appointment.id).await.unwrap();
    let again = scheduler.cancel(appointment.id).await.unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);

    assert_eq!(
        sink.events(),
        vec![("booking", appointment.id), ("cancellation", appointment.id)]
    );
}

#[tokio::test]
async fn optimize_day_applies_a_whole_batch() {
    let (registry, scheduler) = scheduler_with(3, Arc::new(RecordingSink::default()));
    let doctor = register(&registry, "Dr. Shift").await;
    registry.approve(doctor).await.unwrap();

    let appointment = scheduler.book_routine(routine(doctor)).await.unwrap();
    let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

    let updated = scheduler
        .optimize_day(vec![ReassignmentChange {
            appointment_id: appointment.id,
            chair_id: Some(3),
            time: Some(ten),
            status: Some(AppointmentStatus::Pending),
        }])
        .await
        .unwrap();

    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].chair_id, Some(3));
    assert_eq!(updated[0].time, ten);
    assert_eq!(updated[0].status, AppointmentStatus::Pending);

    // The 09:00 slot is free again
    assert!(scheduler.book_routine(routine(doctor)).await.is_ok());

    assert!(scheduler.optimize_day(Vec::new()).await.unwrap().is_empty());
}
