//! Customer management endpoints. All of them require the ManageUsers
//! capability.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, Role};
use domain::policy::{self, Capability};
use domain::{CustomerView, DomainError};
use serde::Deserialize;
use store::{CommerceStore, NewCustomer};
use uuid::Uuid;

use crate::AppState;
use crate::auth::{self, AuthUser};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// POST /customers — registers an account with a hashed credential.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerView>), ApiError> {
    policy::require(user.0.role, Capability::ManageUsers)?;
    if req.password.is_empty() {
        return Err(DomainError::Invalid("password must not be empty".to_string()).into());
    }

    let password_hash =
        auth::hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let view = state
        .customers
        .create_customer(NewCustomer {
            name: req.name,
            email: req.email,
            password_hash,
            role: req.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /customers — every account, oldest first.
#[tracing::instrument(skip(state, user))]
pub async fn list<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<CustomerView>>, ApiError> {
    policy::require(user.0.role, Capability::ManageUsers)?;
    let customers = state.customers.list_customers().await?;
    Ok(Json(customers))
}

/// PATCH /customers/:id/role — re-roles another account.
#[tracing::instrument(skip(state, user, req))]
pub async fn set_role<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<CustomerView>, ApiError> {
    policy::require(user.0.role, Capability::ManageUsers)?;
    let view = state
        .customers
        .set_role(CustomerId::from(id), req.role, &user.0.email)
        .await?;
    Ok(Json(view))
}

/// DELETE /customers/:id — deletes another, order-less account.
#[tracing::instrument(skip(state, user))]
pub async fn delete<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    policy::require(user.0.role, Capability::ManageUsers)?;
    state
        .customers
        .delete_customer(CustomerId::from(id), &user.0.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
