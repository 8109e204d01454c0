//! License pool storage.
//!
//! The pool is the only shared mutable state in the system; every invocation
//! may run in a different process, so all coordination goes through the
//! store's own atomicity guarantees rather than in-process locks.
//!
//! `LicenseStore` is the seam between the allocator algorithm and the
//! backing store. The Postgres implementation is the production store; the
//! in-memory implementation backs development and tests.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::license::LicenseCode;

pub mod memory;
pub mod postgres;

pub use postgres::PgLicenseStore;

/// Result of one atomic claim attempt against the pool.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// An available code was transitioned to claimed for this transaction.
    Claimed(LicenseCode),

    /// The uniqueness constraint fired because this transaction already
    /// holds a code; the existing row was read back.
    AlreadyClaimed(LicenseCode),

    /// No available code exists in the pool.
    NoneAvailable,

    /// Available codes exist but every candidate was taken by a concurrent
    /// claim mid-flight. The caller may retry.
    Contended,
}

/// Pool inventory counts for the operator view.
#[derive(Debug, Clone, Copy)]
pub struct PoolCounts {
    pub available: i64,
    pub claimed: i64,
}

/// Storage port for the license code pool.
///
/// # Contract
///
/// - `find_by_transaction` performs no writes; it is the idempotency path
///   and must stay a pure read.
/// - `try_claim` performs exactly one atomic conditional transition. Two
///   concurrent calls must never both claim the same row, and two calls for
///   the same transaction must never end up holding two rows.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Look up the code already bound to a transaction, if any.
    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LicenseCode>, AppError>;

    /// Atomically transition one available code to claimed for this
    /// transaction.
    async fn try_claim(&self, transaction_id: &str) -> Result<ClaimOutcome, AppError>;

    /// Count available and claimed codes.
    async fn pool_counts(&self) -> Result<PoolCounts, AppError>;

    /// Probe store connectivity.
    async fn ping(&self) -> Result<(), AppError>;
}
