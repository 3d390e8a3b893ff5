//! Administrator dashboard endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::DashboardStats;
use domain::policy::{self, Capability};
use store::CommerceStore;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// GET /dashboard/stats — revenue, order counts, and top-5 aggregates.
#[tracing::instrument(skip(state, user))]
pub async fn stats<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<DashboardStats>, ApiError> {
    policy::require(user.0.role, Capability::ViewDashboard)?;
    let stats = state.dashboard.stats().await?;
    Ok(Json(stats))
}
