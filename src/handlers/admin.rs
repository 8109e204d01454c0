//! Operator inventory HTTP handlers.
//!
//! Admin routes sit behind the admin-key middleware. They exist so an
//! operator can see pool inventory before exhaustion rejects customers.

use axum::{Json, extract::State};

use crate::{
    error::AppError, models::license::PoolStatusResponse, state::AppState, store::LicenseStore,
};

/// Report pool inventory.
///
/// # Response (200)
///
/// ```json
/// {
///   "available": 37,
///   "claimed": 63,
///   "total": 100
/// }
/// ```
pub async fn pool_status(
    State(state): State<AppState>,
) -> Result<Json<PoolStatusResponse>, AppError> {
    let counts = state.store.pool_counts().await?;

    Ok(Json(PoolStatusResponse {
        available: counts.available,
        claimed: counts.claimed,
        total: counts.available + counts.claimed,
    }))
}
