//! License code data models and API request/response types.
//!
//! This module defines:
//! - `LicenseCode`: Database entity representing one code in the pool
//! - `ClaimRequest` / `ClaimResponse`: the claim endpoint's request and response bodies
//! - `PoolStatusResponse`: the operator inventory view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status value for a code that has not been handed out yet.
pub const STATUS_AVAILABLE: &str = "available";

/// Status value for a code permanently bound to a transaction.
pub const STATUS_CLAIMED: &str = "claimed";

/// Represents a license code record from the database.
///
/// # Database Table
///
/// Maps to the `license_codes` table. Each code:
/// - Is pre-generated by external tooling and inserted as `available`
/// - Transitions to `claimed` at most once, and `claimed` is terminal
/// - Records the payment transaction that claimed it, never overwritten
///
/// # Uniqueness
///
/// A partial unique index on `claimed_by_transaction` guarantees at most one
/// code per transaction identifier. The claim path relies on this constraint
/// as a safety net: a duplicate-claim race surfaces as a constraint conflict
/// instead of silently assigning two codes to one purchase.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LicenseCode {
    /// Unique identifier for this row
    pub id: Uuid,

    /// The opaque license code string delivered to the customer
    ///
    /// Immutable once created. Unique across the pool.
    pub code: String,

    /// Pool status, either "available" or "claimed"
    ///
    /// Enforced by a database CHECK constraint. The transition
    /// available -> claimed is one-way.
    pub status: String,

    /// Payment transaction identifier that claimed this code
    ///
    /// NULL while available. Set exactly once, atomically with the status
    /// transition, and never changed afterwards.
    pub claimed_by_transaction: Option<String>,

    /// When this code was claimed
    ///
    /// Set atomically with `status -> claimed`.
    pub claimed_at: Option<DateTime<Utc>>,

    /// When this code was seeded into the pool
    pub created_at: DateTime<Utc>,
}

impl LicenseCode {
    /// Whether this code is still available for a new claim.
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }
}

/// Request to claim the license code for a paid transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
///
/// # Idempotency
///
/// Sending the same `transaction_id` any number of times returns the same
/// code. Browser reloads of the post-checkout page are expected callers.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// The payment processor's checkout session identifier
    pub transaction_id: String,
}

/// Response returned for a successful claim.
///
/// # JSON Example
///
/// ```json
/// {
///   "code": "SHOR-4F7A-91BC-D203",
///   "transaction_id": "cs_test_a1b2c3"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    /// The license code now permanently bound to the transaction
    pub code: String,

    /// The transaction identifier the code is bound to
    pub transaction_id: String,
}

/// Operator view of pool inventory.
///
/// # JSON Example
///
/// ```json
/// {
///   "available": 37,
///   "claimed": 63,
///   "total": 100
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct PoolStatusResponse {
    /// Codes still available for new claims
    pub available: i64,

    /// Codes already bound to a transaction
    pub claimed: i64,

    /// Pool size
    pub total: i64,
}
