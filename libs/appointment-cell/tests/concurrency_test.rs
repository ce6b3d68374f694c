// libs/appointment-cell/tests/concurrency_test.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;
use uuid::Uuid;

use appointment_cell::models::{BookAppointmentRequest, EmergencyRequest};
use appointment_cell::services::{AppointmentLedger, ChairPool};
use doctor_cell::models::RegisterDoctorRequest;
use doctor_cell::services::DoctorRegistry;
use shared_models::error::SchedulingError;

const CONTENDERS: usize = 32;

fn slot() -> (NaiveDate, NaiveTime) {
    (
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )
}

async fn approved_doctor(registry: &DoctorRegistry, name: &str) -> Uuid {
    let doctor_id = registry
        .register(RegisterDoctorRequest {
            name: name.to_string(),
            specialty: "Pedodontics".to_string(),
            contact: "desk@clinic.in".to_string(),
        })
        .await
        .unwrap();
    registry.approve(doctor_id).await.unwrap();
    doctor_id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_bookings_for_one_doctor_slot_have_one_winner() {
    let registry = Arc::new(DoctorRegistry::new());
    let ledger = Arc::new(AppointmentLedger::new(registry.clone(), ChairPool::new(8)));
    let doctor_id = approved_doctor(&registry, "Dr. Busy").await;
    let (date, time) = slot();

    let attempts = (0..CONTENDERS).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .book(BookAppointmentRequest {
                    patient_id: Uuid::new_v4(),
                    doctor_id,
                    date,
                    time,
                    chair_id: None,
                })
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(SchedulingError::Conflict(_))))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(conflicts, CONTENDERS - 1);
    assert_eq!(ledger.list_by_doctor(doctor_id).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_bookings_for_one_chair_have_one_winner() {
    let registry = Arc::new(DoctorRegistry::new());
    let ledger = Arc::new(AppointmentLedger::new(registry.clone(), ChairPool::new(3)));
    let (date, time) = slot();

    let mut doctors = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        doctors.push(approved_doctor(&registry, &format!("Dr. {}", i)).await);
    }

    let attempts = doctors.into_iter().map(|doctor_id| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .book(BookAppointmentRequest {
                    patient_id: Uuid::new_v4(),
                    doctor_id,
                    date,
                    time,
                    chair_id: Some(2),
                })
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(SchedulingError::Conflict(_)))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_emergencies_never_share_a_chair() {
    let registry = Arc::new(DoctorRegistry::new());
    let ledger = Arc::new(AppointmentLedger::new(registry.clone(), ChairPool::new(3)));
    let doctor_id = approved_doctor(&registry, "Dr. OnCall").await;
    let (date, time) = slot();

    let attempts = (0..CONTENDERS).map(|i| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let request = EmergencyRequest {
                patient_id: Uuid::new_v4(),
                doctor_id,
                date,
                time,
                priority: Some(i as i32),
                urgency_level: None,
                notes: None,
            };
            ledger.insert_emergency(&request, i as i32).await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let mut chairs: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .filter_map(|a| a.chair_id)
        .collect();
    chairs.sort_unstable();

    assert_eq!(chairs, vec![1, 2, 3]);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(SchedulingError::NoCapacity { .. })))
            .count(),
        CONTENDERS - 3
    );
}
