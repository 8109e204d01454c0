//! Checkout session HTTP handler.
//!
//! This module implements the endpoint the front end calls before
//! redirecting the customer to the payment processor:
//! - POST /api/v1/checkout - Create a hosted checkout session

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};

use crate::{
    error::AppError,
    models::payment::{CheckoutRequest, CheckoutResponse},
    state::AppState,
};

/// Create a checkout session for the configured product.
///
/// # Request Body (optional)
///
/// ```json
/// {
///   "product": "shoring_suite_license"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "checkout_url": "https://checkout.example.com/pay/cs_test_a1b2c3",
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
///
/// # Process
///
/// Pure delegation to the payment processor. The customer's return URLs are
/// derived from the request's `Origin` header, so the processor sends the
/// browser back to whichever site started the checkout. A product selector,
/// if sent, must name the one product this deployment sells.
///
/// # Errors
///
/// - 400 if the `Origin` header is missing or not a valid URL, or the
///   selector names an unknown product
/// - 502 if the processor is unreachable or rejects the request
pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<CheckoutRequest>>,
) -> Result<Json<CheckoutResponse>, AppError> {
    // Browser callers always send Origin on cross-origin POSTs
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::InvalidRequest("Origin header is required".to_string()))?;

    // Reject garbage origins before handing them to the processor as
    // redirect targets
    url::Url::parse(origin)
        .map_err(|_| AppError::InvalidRequest("Origin header is not a valid URL".to_string()))?;

    // Single-product deployment: a selector may only name that product
    if let Some(requested) = body.and_then(|Json(request)| request.product) {
        if requested != state.payments.product_tag() {
            return Err(AppError::InvalidRequest(format!(
                "unknown product: {requested}"
            )));
        }
    }

    let session = state.payments.create_checkout_session(origin).await?;

    Ok(Json(session))
}
