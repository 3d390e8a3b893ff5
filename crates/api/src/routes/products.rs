//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use domain::policy::{self, Capability};
use domain::{ProductPage, ProductView};
use serde::Deserialize;
use store::{CommerceStore, NewProduct};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetStockRequest {
    pub stock: u32,
}

/// POST /products — adds a product to the catalog.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductView>), ApiError> {
    policy::require(user.0.role, Capability::ManageCatalog)?;
    let view = state
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price: Money::from_cents(req.price_cents),
            stock: req.stock,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /products?limit=&offset= — one page of the catalog.
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<ProductPage>, ApiError> {
    let view = state.catalog.list_products(page.limit, page.offset).await?;
    Ok(Json(view))
}

/// PATCH /products/:id/stock — absolute stock replacement.
#[tracing::instrument(skip(state, user, req))]
pub async fn set_stock<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStockRequest>,
) -> Result<Json<ProductView>, ApiError> {
    policy::require(user.0.role, Capability::ManageCatalog)?;
    let view = state
        .catalog
        .set_stock(ProductId::from(id), req.stock)
        .await?;
    Ok(Json(view))
}

/// DELETE /products/:id — removes an unreferenced product.
#[tracing::instrument(skip(state, user))]
pub async fn delete<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    policy::require(user.0.role, Capability::ManageCatalog)?;
    state.catalog.delete_product(ProductId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
