//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (payment verification, license allocation)
//! 3. Returns HTTP response (JSON, status code)

/// Operator inventory endpoints
pub mod admin;
/// Checkout session creation endpoint
pub mod checkout;
/// Health check endpoint
pub mod health;
/// License claim endpoint
pub mod licenses;
