use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Gate for clinic administration actions (approvals, emergency slots,
/// re-optimization, reports).
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Administrator role required".to_string()))
    }
}

fn is_staff(user: &User) -> bool {
    matches!(user.role.as_deref(), Some("admin") | Some("doctor"))
}

/// Clinic staff only: administrators and doctors.
pub fn require_staff(user: &User) -> Result<(), AppError> {
    if is_staff(user) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Clinic staff role required".to_string()))
    }
}

/// Patients may only act on their own records; staff may act on anyone's.
pub fn require_self_or_staff(user: &User, patient_id: &str) -> Result<(), AppError> {
    if is_staff(user) || user.id == patient_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this patient's records".to_string()))
    }
}
