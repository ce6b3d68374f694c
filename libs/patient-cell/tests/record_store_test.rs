use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::RegisterDoctorRequest;
use doctor_cell::services::DoctorRegistry;
use notification_cell::models::NotificationType;
use notification_cell::services::NotificationService;
use patient_cell::models::{
    CreatePatientRequest, CreatePaymentRequest, CreateTreatmentNoteRequest, PatientError, PaymentStatus,
};
use patient_cell::{patient_routes, PatientCellState, PatientService, PaymentService, TreatmentNoteService};
use shared_utils::test_utils::{JwtTestUtils, MockRecordStoreResponses, TestConfig, TestUser};

struct TestApp {
    router: Router,
    patients: Arc<PatientService>,
    payments: Arc<PaymentService>,
    notifications: Arc<NotificationService>,
    treatment_notes: Arc<TreatmentNoteService>,
    doctors: Arc<DoctorRegistry>,
    secret: String,
}

impl TestApp {
    fn new(server: &MockServer) -> Self {
        let test_config = TestConfig::with_record_store(&server.uri());
        let config = test_config.to_arc();
        let notifications = Arc::new(NotificationService::new());
        let patients = Arc::new(PatientService::new(&config));
        let payments = Arc::new(PaymentService::new(&config, patients.clone(), notifications.clone()));
        let doctors = Arc::new(DoctorRegistry::new());
        let treatment_notes = Arc::new(TreatmentNoteService::new(&config, patients.clone(), doctors.clone()));

        let router = patient_routes(PatientCellState {
            config,
            patients: patients.clone(),
            payments: payments.clone(),
            treatment_notes: treatment_notes.clone(),
        });

        Self {
            router,
            patients,
            payments,
            notifications,
            treatment_notes,
            doctors,
            secret: test_config.jwt_secret,
        }
    }

    async fn doctor(&self) -> Uuid {
        self.doctors
            .register(RegisterDoctorRequest {
                name: "Dr. Iyer".to_string(),
                specialty: "Endodontics".to_string(),
                contact: "dr.iyer@clinic.in".to_string(),
            })
            .await
            .unwrap()
    }

    async fn send(&self, method: &str, uri: &str, user: &TestUser, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", JwtTestUtils::bearer_for(user, &self.secret));
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

async fn mock_patient_lookup(server: &MockServer, patient_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockRecordStoreResponses::patient_response(patient_id)])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_patient_requires_every_identity_field() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let result = app
        .patients
        .create_patient(
            CreatePatientRequest {
                name: Some("Asha Rao".into()),
                age: None,
                gender: Some(" ".into()),
                contact: Some("+91 98765 43210".into()),
            },
            "token",
        )
        .await;

    assert_matches!(result, Err(PatientError::ValidationError(msg)) if msg.contains("age") && msg.contains("gender"));
}

#[tokio::test]
async fn create_patient_stores_the_record() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({"name": "Asha Rao", "age": 34})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([MockRecordStoreResponses::patient_response(&patient_id)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let staff = TestUser::admin("admin@clinic.in");
    let (status, body) = app
        .send(
            "POST",
            "/",
            &staff,
            Some(json!({"name": "Asha Rao", "age": 34, "gender": "female", "contact": "+91 98765 43210"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["id"], patient_id);
    assert_eq!(body["patient"]["age"], 34);
}

#[tokio::test]
async fn get_patient_forwards_token_and_maps_missing_rows() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("asha@example.com");
    mock_patient_lookup(&server, &patient.id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);

    let (status, body) = app.send("GET", &format!("/{}", patient.id), &patient, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Asha Rao");

    let admin = TestUser::admin("admin@clinic.in");
    let (status, _) = app.send("GET", &format!("/{}", Uuid::new_v4()), &admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", &format!("/{}", Uuid::new_v4()), &patient, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_payment_emits_action_required_notification() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    mock_patient_lookup(&server, &patient_id.to_string()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({"status": "pending", "date": "2024-07-01"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRecordStoreResponses::payment_response(&patient_id.to_string(), "pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let payment = app
        .payments
        .create_payment(
            CreatePaymentRequest {
                patient_id: Some(patient_id),
                amount: Some(1500.0),
                date: Some("2024-07-01".parse().unwrap()),
                status: Some(PaymentStatus::Pending),
            },
            "token",
        )
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Pending);

    let notifications = app.notifications.list_for_patient(patient_id).await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].notification_type, NotificationType::Payment);
    assert!(notifications[0].action_required);
}

#[tokio::test]
async fn payment_validation_and_store_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let admin = TestUser::admin("admin@clinic.in");

    let (status, body) = app
        .send("POST", "/payments", &admin, Some(json!({"amount": 200.0})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("patient_id"));

    let result = app
        .payments
        .create_payment(
            CreatePaymentRequest {
                patient_id: Some(Uuid::new_v4()),
                amount: Some(-5.0),
                date: Some("2024-07-01".parse().unwrap()),
                status: Some(PaymentStatus::Completed),
            },
            "token",
        )
        .await;
    assert_matches!(result, Err(PatientError::ValidationError(_)));

    let (status, _) = app
        .send("GET", &format!("/{}/payments", Uuid::new_v4()), &admin, None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn payments_are_listed_per_patient() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("asha@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .and(query_param("order", "date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRecordStoreResponses::payment_response(&patient.id, "completed"),
            MockRecordStoreResponses::payment_response(&patient.id, "paid"),
        ])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .send("GET", &format!("/{}/payments", patient.id), &patient, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["payments"][1]["status"], "completed");
}

fn note_response(patient_id: &str, doctor_id: &str, diagnosis: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "doctor_id": doctor_id,
        "patient_id": patient_id,
        "diagnosis": diagnosis,
        "treatment_plan": "Composite filling",
        "notes": null,
        "created_at": "2024-07-01T09:30:00Z"
    })
}

#[tokio::test]
async fn treatment_note_needs_diagnosis_and_a_registered_doctor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/treatment_notes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let doctor_id = app.doctor().await;

    let result = app
        .treatment_notes
        .create_note(
            CreateTreatmentNoteRequest {
                patient_id: Some(Uuid::new_v4()),
                doctor_id: Some(doctor_id),
                diagnosis: Some("  ".into()),
                ..Default::default()
            },
            "token",
        )
        .await;
    assert_matches!(result, Err(PatientError::ValidationError(msg)) if msg.contains("diagnosis"));

    let stranger = Uuid::new_v4();
    let result = app
        .treatment_notes
        .create_note(
            CreateTreatmentNoteRequest {
                patient_id: Some(Uuid::new_v4()),
                doctor_id: Some(stranger),
                diagnosis: Some("Cavity in upper right molar".into()),
                ..Default::default()
            },
            "token",
        )
        .await;
    assert_matches!(result, Err(PatientError::DoctorNotFound(id)) if id == stranger);
}

#[tokio::test]
async fn staff_record_notes_and_patients_read_their_own() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("asha@example.com");
    mock_patient_lookup(&server, &patient.id).await;

    let app = TestApp::new(&server);
    let doctor_id = app.doctor().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/treatment_notes"))
        .and(body_partial_json(json!({
            "patient_id": patient.id,
            "doctor_id": doctor_id,
            "diagnosis": "Cavity in upper right molar",
            "notes": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            note_response(&patient.id, &doctor_id.to_string(), "Cavity in upper right molar")
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/treatment_notes"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            note_response(&patient.id, &doctor_id.to_string(), "Cavity in upper right molar")
        ])))
        .mount(&server)
        .await;

    let note = json!({
        "patient_id": patient.id,
        "doctor_id": doctor_id,
        "diagnosis": "Cavity in upper right molar",
        "treatment_plan": "Composite filling",
        "notes": " "
    });

    let (status, _) = app.send("POST", "/treatment-notes", &patient, Some(note.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let staff = TestUser::doctor("dr.iyer@clinic.in");
    let (status, body) = app.send("POST", "/treatment-notes", &staff, Some(note)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["treatment_note"]["diagnosis"], "Cavity in upper right molar");

    let (status, body) = app
        .send("GET", &format!("/{}/treatment-notes", patient.id), &patient, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let other = TestUser::patient("ravi@example.com");
    let (status, _) = app
        .send("GET", &format!("/{}/treatment-notes", patient.id), &other, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn doctor_note_history_is_staff_only() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let first = Uuid::new_v4().to_string();
    let second = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/treatment_notes"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            note_response(&first, &doctor_id.to_string(), "Misaligned teeth"),
            note_response(&second, &doctor_id.to_string(), "Impacted wisdom tooth"),
        ])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let uri = format!("/treatment-notes/doctors/{}", doctor_id);

    let (status, _) = app.send("GET", &uri, &TestUser::patient("asha@example.com"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", &uri, &TestUser::admin("admin@clinic.in"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["treatment_notes"][1]["diagnosis"], "Impacted wisdom tooth");
}
