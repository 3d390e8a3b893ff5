//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderStatus};
use domain::policy::{self, Capability};
use domain::{OrderCreated, OrderDetail, OrderItemInput, OrderSummary};
use serde::Deserialize;
use store::CommerceStore;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// POST /orders — creates an Open order owned by the caller.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreated>), ApiError> {
    let created = state.orders.create_order(&user.0.email, &req.items).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /orders — all orders for managerial callers, own orders otherwise.
#[tracing::instrument(skip(state, user))]
pub async fn list<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let summaries = state.orders.list_orders(&user.0).await?;
    Ok(Json(summaries))
}

/// GET /orders/:id — order detail, post-authorized against ownership.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = state.orders.get_order(OrderId::from(id), &user.0).await?;
    Ok(Json(detail))
}

/// PATCH /orders/:id/status — transitions an Open order.
#[tracing::instrument(skip(state, user, req))]
pub async fn set_status<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<OrderSummary>, ApiError> {
    policy::require(user.0.role, Capability::MutateOrderStatus)?;
    let summary = state.orders.set_status(OrderId::from(id), req.status).await?;
    Ok(Json(summary))
}
