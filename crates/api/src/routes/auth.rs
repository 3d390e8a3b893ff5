//! Login and token issuance.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::Role;
use serde::{Deserialize, Serialize};
use store::{CommerceStore, CustomerDirectory};

use crate::AppState;
use crate::auth;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub name: String,
    pub role: Role,
}

/// POST /auth/login — verifies credentials and issues a bearer token.
///
/// Unknown email and wrong password produce the same 401 so the response
/// does not reveal which accounts exist.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let customer = state
        .store
        .find_by_email(&req.email)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&req.password, &customer.password_hash) {
        tracing::warn!(email = %req.email, "failed login attempt");
        return Err(invalid());
    }

    let token = state
        .auth
        .issue_token(&customer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    metrics::counter!("logins_total").increment(1);
    tracing::info!(email = %customer.email, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        name: customer.name,
        role: customer.role,
    }))
}
