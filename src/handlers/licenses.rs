//! License claim HTTP handler.
//!
//! This module implements the endpoint the front end calls after the
//! customer returns from the hosted checkout page:
//! - POST /api/v1/licenses/claim - Exchange a paid transaction for a license code

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    models::license::{ClaimRequest, ClaimResponse},
    services::license_service,
    state::AppState,
};

/// Claim the license code for a paid transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "code": "SHOR-4F7A-91BC-D203",
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
///
/// # Process
///
/// 1. Validate the transaction identifier is non-empty
/// 2. Verify the payment at the processor (status, amount, product)
/// 3. Claim a code, idempotently: replays and duplicate calls for the same
///    transaction always receive the identical code
///
/// # Retry Behavior
///
/// The call is safe to repeat. A browser reload, a duplicated network call,
/// or a retry after a dropped connection all land on the idempotency path
/// and return the already-assigned code. Verification failures are reported
/// as rejected claims with a reason code and are never retried here.
pub async fn claim_license(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let transaction_id = request.transaction_id.trim();
    if transaction_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "transaction_id is required".to_string(),
        ));
    }

    // Confirm payment before any allocation is attempted
    let verified = state.payments.verify(transaction_id).await?;

    // Idempotent claim against the pool
    let license = license_service::claim_code(&state.store, &verified.transaction_id).await?;

    Ok(Json(ClaimResponse {
        code: license.code,
        transaction_id: verified.transaction_id,
    }))
}
