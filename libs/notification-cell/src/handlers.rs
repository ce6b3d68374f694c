use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_self_or_staff;

use crate::router::NotificationCellState;

#[axum::debug_handler]
pub async fn list_patient_notifications(
    State(state): State<NotificationCellState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let notifications = state.notifications.list_for_patient(patient_id).await;
    let unread = notifications.iter().filter(|n| !n.read).count();

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len(),
        "unread": unread
    })))
}

#[axum::debug_handler]
pub async fn get_unread_count(
    State(state): State<NotificationCellState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_staff(&user, &patient_id.to_string())?;

    let unread = state.notifications.unread_count(patient_id).await;

    Ok(Json(json!({
        "patient_id": patient_id,
        "unread": unread
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<NotificationCellState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let existing = state.notifications.get(notification_id).await?;
    require_self_or_staff(&user, &existing.patient_id.to_string())?;

    let notification = state.notifications.mark_read(notification_id).await?;

    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}
