//! License allocator - Core business logic for handing out codes.
//!
//! This service guarantees, for any mix of retried and concurrent calls:
//! - **Idempotency**: every claim for the same transaction returns the
//!   identical code
//! - **Exclusivity**: no two transactions ever receive the same code
//! - **Liveness**: a new transaction succeeds while any code is available
//!
//! # Atomicity Guarantees
//!
//! The service itself holds no locks. Each `try_claim` is a single atomic
//! transition inside the store, and the store's uniqueness constraint on
//! `claimed_by_transaction` backstops the idempotency read, so correctness
//! holds across processes.

use crate::error::AppError;
use crate::models::license::LicenseCode;
use crate::store::{ClaimOutcome, LicenseStore};

/// How many times a claim retries after losing a row race before giving up.
///
/// Races are only possible against other in-flight claims, so a small budget
/// is enough; exhausting it returns a retryable conflict to the caller.
const CLAIM_RETRY_LIMIT: u32 = 3;

/// Claim the license code for a verified, paid transaction.
///
/// # Process
///
/// 1. Idempotency check first: a transaction that already holds a code gets
///    it back from a pure read, before any claim is attempted
/// 2. Atomic claim: transition one available row to claimed
/// 3. On a lost row race, retry against a different row (bounded)
///
/// Callers must have verified the payment for `transaction_id` before
/// calling this.
///
/// # Errors
///
/// - `PoolExhausted`: no available code remains; an operator must seed more
/// - `ClaimContention`: every attempt lost its race within the retry budget
/// - `ClaimInvariantViolation`: the store's uniqueness constraint and the
///   idempotency read disagree (must never happen)
/// - `StoreUnavailable` / `Database`: the store could not be used
pub async fn claim_code<S>(store: &S, transaction_id: &str) -> Result<LicenseCode, AppError>
where
    S: LicenseStore + ?Sized,
{
    // Replays of an already-satisfied claim stay read-only
    if let Some(existing) = store.find_by_transaction(transaction_id).await? {
        tracing::debug!(
            "Transaction {} already holds code id {}, returning it",
            transaction_id,
            existing.id
        );
        return Ok(existing);
    }

    for attempt in 1..=CLAIM_RETRY_LIMIT {
        match store.try_claim(transaction_id).await? {
            ClaimOutcome::Claimed(row) => {
                tracing::info!(
                    "Assigned license code id {} to transaction {}",
                    row.id,
                    transaction_id
                );
                return Ok(row);
            }

            // A duplicate call for this transaction won the race; both
            // callers report the same code.
            ClaimOutcome::AlreadyClaimed(row) => {
                tracing::debug!(
                    "Transaction {} was claimed concurrently, returning code id {}",
                    transaction_id,
                    row.id
                );
                return Ok(row);
            }

            // Fatal for this call. Not retried: the pool will not refill on
            // its own.
            ClaimOutcome::NoneAvailable => {
                tracing::error!(
                    "License pool exhausted, transaction {} cannot be served",
                    transaction_id
                );
                return Err(AppError::PoolExhausted);
            }

            ClaimOutcome::Contended => {
                tracing::warn!(
                    "Claim attempt {}/{} for transaction {} lost a row race, retrying",
                    attempt,
                    CLAIM_RETRY_LIMIT,
                    transaction_id
                );
            }
        }
    }

    Err(AppError::ClaimContention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLicenseStore;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn pool_of_two_serves_two_transactions_then_exhausts() {
        let store = MemoryLicenseStore::with_codes(["A", "B"]);

        let first = claim_code(&store, "tx1").await.unwrap();
        // Replay returns the identical code without consuming the pool
        let replay = claim_code(&store, "tx1").await.unwrap();
        assert_eq!(first.code, replay.code);

        let second = claim_code(&store, "tx2").await.unwrap();
        assert_ne!(first.code, second.code);

        let err = claim_code(&store, "tx3").await.unwrap_err();
        assert!(matches!(err, AppError::PoolExhausted));
    }

    #[tokio::test]
    async fn exhaustion_leaves_existing_claims_untouched() {
        let store = MemoryLicenseStore::with_codes(["A"]);

        let claimed = claim_code(&store, "tx1").await.unwrap();
        claim_code(&store, "tx2").await.unwrap_err();

        // tx1's binding survived the failed claim
        let still_there = store.find_by_transaction("tx1").await.unwrap().unwrap();
        assert_eq!(still_there.code, claimed.code);
        let counts = store.pool_counts().await.unwrap();
        assert_eq!(counts.available, 0);
        assert_eq!(counts.claimed, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_distinct_transactions_drain_the_pool_without_double_issue() {
        const POOL: usize = 8;
        let codes: Vec<String> = (0..POOL).map(|i| format!("CODE-{i}")).collect();
        let store = Arc::new(MemoryLicenseStore::with_codes(codes));

        let mut tasks = JoinSet::new();
        for i in 0..POOL {
            let store = Arc::clone(&store);
            tasks.spawn(async move { claim_code(store.as_ref(), &format!("tx-{i}")).await });
        }

        let mut issued = HashSet::new();
        while let Some(result) = tasks.join_next().await {
            let row = result.unwrap().unwrap();
            // Every caller got a code nobody else got
            assert!(issued.insert(row.code));
        }

        assert_eq!(issued.len(), POOL);
        let counts = store.pool_counts().await.unwrap();
        assert_eq!(counts.available, 0);
        assert_eq!(counts.claimed, POOL as i64);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_duplicate_transactions_share_one_code() {
        let store = Arc::new(MemoryLicenseStore::with_codes(["A", "B", "C", "D"]));

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { claim_code(store.as_ref(), "tx-dup").await });
        }

        let mut codes = HashSet::new();
        while let Some(result) = tasks.join_next().await {
            codes.insert(result.unwrap().unwrap().code);
        }

        // All eight calls resolved to the same single code
        assert_eq!(codes.len(), 1);
        let counts = store.pool_counts().await.unwrap();
        assert_eq!(counts.available, 3);
        assert_eq!(counts.claimed, 1);
    }
}
