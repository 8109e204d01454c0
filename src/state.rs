//! Shared application state injected into every handler.

use crate::services::payment_service::PaymentClient;
use crate::store::PgLicenseStore;

/// State shared across all routes via Axum's `State` extractor.
///
/// Everything in here is cheap to clone: the store wraps a pooled
/// connection handle and the payment client shares one HTTP connection
/// pool.
#[derive(Clone)]
pub struct AppState {
    /// License pool store
    pub store: PgLicenseStore,

    /// Payment processor client
    pub payments: PaymentClient,

    /// SHA-256 hex digest of the operator admin key
    ///
    /// `None` when no admin key is configured, which disables the admin
    /// routes entirely.
    pub admin_key_hash: Option<String>,
}
