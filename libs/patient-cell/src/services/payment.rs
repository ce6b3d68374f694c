use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::PaymentEvent;
use notification_cell::services::NotificationService;
use shared_config::AppConfig;
use shared_database::RecordStoreClient;

use crate::models::{require_fields, CreatePaymentRequest, Payment, PatientError};
use crate::services::PatientService;

pub struct PaymentService {
    store: RecordStoreClient,
    patients: Arc<PatientService>,
    notifications: Arc<NotificationService>,
}

impl PaymentService {
    pub fn new(config: &AppConfig, patients: Arc<PatientService>, notifications: Arc<NotificationService>) -> Self {
        Self {
            store: RecordStoreClient::new(config),
            patients,
            notifications,
        }
    }

    /// Store a payment, then emit the payment notification. A failed
    /// notification is logged and the stored payment is still returned.
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        auth_token: &str,
    ) -> Result<Payment, PatientError> {
        require_fields(&[
            ("patient_id", request.patient_id.is_some()),
            ("amount", request.amount.is_some()),
            ("date", request.date.is_some()),
            ("status", request.status.is_some()),
        ])?;

        let (Some(patient_id), Some(amount), Some(date), Some(status)) =
            (request.patient_id, request.amount, request.date, request.status)
        else {
            return Err(PatientError::ValidationError("Incomplete payment".to_string()));
        };

        if !amount.is_finite() || amount < 0.0 {
            return Err(PatientError::ValidationError(format!(
                "Payment amount {} must be a non-negative number",
                amount
            )));
        }

        // Payments reference an existing patient record
        self.patients.get_patient(patient_id, auth_token).await?;

        let row = self
            .store
            .insert(
                "payments",
                json!({
                    "patient_id": patient_id,
                    "amount": amount,
                    "date": date.format("%Y-%m-%d").to_string(),
                    "status": status,
                }),
                Some(auth_token),
            )
            .await?;
        let payment: Payment = serde_json::from_value(row)?;

        info!("Payment {} stored for patient {}", payment.id, patient_id);

        let event = PaymentEvent {
            patient_id: payment.patient_id,
            amount: payment.amount,
            date: payment.date,
            status: payment.status,
        };
        if let Err(e) = self.notifications.on_payment(&event).await {
            warn!("Payment notification for payment {} failed: {}", payment.id, e);
        }

        Ok(payment)
    }

    /// Most recent first.
    pub async fn list_payments_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Payment>, PatientError> {
        debug!("Fetching payments for patient: {}", patient_id);

        let path = format!("/rest/v1/payments?patient_id=eq.{}&order=date.desc", patient_id);
        let rows: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(PatientError::from))
            .collect()
    }
}
