//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Verification Errors**: The payment processor rejected or could not
///   confirm the transaction (`TransactionNotFound`, `PaymentNotCompleted`,
///   `ProductMismatch`, `PaymentProviderUnavailable`, `PaymentProvider`)
/// - **Allocation Errors**: The license pool could not satisfy the claim
///   (`PoolExhausted`, `ClaimContention`, `ClaimInvariantViolation`)
/// - **Infrastructure Errors**: Database connectivity or query failures
///   (`StoreUnavailable`, `Database`)
/// - **Request Errors**: Invalid client input or credentials
///   (`InvalidRequest`, `InvalidAdminKey`)
///
/// Client-input problems map to 4xx responses and inventory/server problems
/// to 5xx, so operators can tell "customer problem" from "inventory problem"
/// in the logs and the front end can show the right message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The payment processor has no record of the transaction identifier.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// The transaction exists but its payment status is not "paid".
    ///
    /// Returns HTTP 402 Payment Required.
    #[error("Payment not completed")]
    PaymentNotCompleted,

    /// The transaction is paid, but its amount, currency, or product metadata
    /// does not match the configured product. No code is released for it.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Paid transaction does not match the configured product")]
    ProductMismatch,

    /// The payment processor could not be reached, even after one retry.
    ///
    /// Returns HTTP 502 Bad Gateway. Safe for the client to retry.
    #[error("Payment provider is unreachable")]
    PaymentProviderUnavailable,

    /// The payment processor answered with an unexpected error.
    ///
    /// Returns HTTP 502 Bad Gateway.
    /// The String contains the processor's status or decode failure.
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    /// The database could not be reached or a connection could not be
    /// acquired within the timeout.
    ///
    /// Returns HTTP 503 Service Unavailable. Safe for the client to retry.
    #[error("Datastore is unavailable")]
    StoreUnavailable,

    /// Every claim attempt lost its row race within the retry budget.
    ///
    /// Returns HTTP 409 Conflict. Safe for the client to retry.
    #[error("License claim is contended, please retry")]
    ClaimContention,

    /// No available license code remains in the pool.
    ///
    /// Returns HTTP 503 Service Unavailable with a distinct error code.
    /// Not retried automatically; an operator must seed more codes.
    #[error("No license codes available")]
    PoolExhausted,

    /// The claim uniqueness constraint fired but no existing claim could be
    /// read back for the transaction. This must never happen; it means the
    /// idempotency lookup and the constraint disagree about pool state.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("License claim state is inconsistent")]
    ClaimInvariantViolation,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Admin key is missing, invalid, or not configured.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid admin key")]
    InvalidAdminKey,

    /// Any other database operation failure (e.g., query error).
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

/// Convert sqlx errors into AppError, separating connectivity failures
/// from query failures.
///
/// Pool acquisition timeouts and I/O errors mean the store itself is
/// unreachable and the request can be retried; everything else is an
/// internal query problem.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => AppError::StoreUnavailable,
            other => AppError::Database(other),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `TransactionNotFound` → 404 Not Found
/// - `PaymentNotCompleted` → 402 Payment Required
/// - `ProductMismatch` → 422 Unprocessable Entity
/// - `PaymentProviderUnavailable` / `PaymentProvider` → 502 Bad Gateway
/// - `StoreUnavailable` → 503 Service Unavailable
/// - `ClaimContention` → 409 Conflict
/// - `PoolExhausted` → 503 Service Unavailable (code `license_pool_exhausted`)
/// - `ClaimInvariantViolation` → 500 Internal Server Error
/// - `InvalidRequest` → 400 Bad Request
/// - `InvalidAdminKey` → 401 Unauthorized
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::TransactionNotFound => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                self.to_string(),
            ),
            AppError::PaymentNotCompleted => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_not_completed",
                self.to_string(),
            ),
            AppError::ProductMismatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "product_mismatch",
                self.to_string(),
            ),
            AppError::PaymentProviderUnavailable => (
                StatusCode::BAD_GATEWAY,
                "payment_provider_unavailable",
                self.to_string(),
            ),
            AppError::PaymentProvider(ref detail) => (
                StatusCode::BAD_GATEWAY,
                "payment_provider_error",
                detail.clone(),
            ),
            AppError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                self.to_string(),
            ),
            AppError::ClaimContention => {
                (StatusCode::CONFLICT, "claim_contention", self.to_string())
            }
            AppError::PoolExhausted => (
                StatusCode::SERVICE_UNAVAILABLE,
                "license_pool_exhausted",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidAdminKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_admin_key",
                self.to_string(),
            ),
            AppError::ClaimInvariantViolation | AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn client_failures_map_to_4xx() {
        assert_eq!(status_of(AppError::TransactionNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::PaymentNotCompleted),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(AppError::ProductMismatch),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::InvalidRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::InvalidAdminKey), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::ClaimContention), StatusCode::CONFLICT);
    }

    #[test]
    fn inventory_and_infrastructure_failures_map_to_5xx() {
        assert_eq!(
            status_of(AppError::PoolExhausted),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::StoreUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::PaymentProviderUnavailable),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::ClaimInvariantViolation),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn connectivity_errors_become_store_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::StoreUnavailable));

        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
