//! In-memory license pool store (for development and tests).
//!
//! The entire claim transition runs under one mutex acquisition, giving the
//! same atomicity the Postgres store gets from its single conditional
//! statement. Not suitable for multi-process deployments.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::license::{LicenseCode, STATUS_AVAILABLE, STATUS_CLAIMED};
use crate::store::{ClaimOutcome, LicenseStore, PoolCounts};

/// Mutex-guarded license pool.
pub struct MemoryLicenseStore {
    rows: Mutex<Vec<LicenseCode>>,
}

impl Default for MemoryLicenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLicenseStore {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Create a pool seeded with the given codes, all available.
    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = codes
            .into_iter()
            .map(|code| LicenseCode {
                id: Uuid::new_v4(),
                code: code.into(),
                status: STATUS_AVAILABLE.to_string(),
                claimed_by_transaction: None,
                claimed_at: None,
                created_at: Utc::now(),
            })
            .collect();

        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LicenseCode>, AppError> {
        let rows = self.rows.lock().unwrap();

        Ok(rows
            .iter()
            .find(|row| row.claimed_by_transaction.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn try_claim(&self, transaction_id: &str) -> Result<ClaimOutcome, AppError> {
        let mut rows = self.rows.lock().unwrap();

        // Same safety net the database constraint provides: a duplicate call
        // that raced past the idempotency read gets the existing row.
        if let Some(existing) = rows
            .iter()
            .find(|row| row.claimed_by_transaction.as_deref() == Some(transaction_id))
        {
            return Ok(ClaimOutcome::AlreadyClaimed(existing.clone()));
        }

        match rows.iter_mut().find(|row| row.is_available()) {
            Some(row) => {
                row.status = STATUS_CLAIMED.to_string();
                row.claimed_by_transaction = Some(transaction_id.to_string());
                row.claimed_at = Some(Utc::now());
                Ok(ClaimOutcome::Claimed(row.clone()))
            }
            // Selection and write share one lock, so contention is not
            // observable here; an empty candidate set means exhaustion.
            None => Ok(ClaimOutcome::NoneAvailable),
        }
    }

    async fn pool_counts(&self) -> Result<PoolCounts, AppError> {
        let rows = self.rows.lock().unwrap();
        let available = rows.iter().filter(|row| row.is_available()).count() as i64;
        let claimed = rows.len() as i64 - available;

        Ok(PoolCounts { available, claimed })
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claims_transition_rows_one_way() {
        let store = MemoryLicenseStore::with_codes(["AAAA", "BBBB"]);

        let outcome = store.try_claim("tx-1").await.unwrap();
        let ClaimOutcome::Claimed(row) = outcome else {
            panic!("expected a fresh claim");
        };
        assert_eq!(row.status, STATUS_CLAIMED);
        assert_eq!(row.claimed_by_transaction.as_deref(), Some("tx-1"));
        assert!(row.claimed_at.is_some());

        let counts = store.pool_counts().await.unwrap();
        assert_eq!(counts.available, 1);
        assert_eq!(counts.claimed, 1);
    }

    #[tokio::test]
    async fn duplicate_claim_returns_the_existing_row() {
        let store = MemoryLicenseStore::with_codes(["AAAA", "BBBB"]);

        let ClaimOutcome::Claimed(first) = store.try_claim("tx-1").await.unwrap() else {
            panic!("expected a fresh claim");
        };
        let ClaimOutcome::AlreadyClaimed(second) = store.try_claim("tx-1").await.unwrap() else {
            panic!("expected the existing claim");
        };
        assert_eq!(first.code, second.code);

        // Still only one row bound to tx-1
        let counts = store.pool_counts().await.unwrap();
        assert_eq!(counts.claimed, 1);
    }

    #[tokio::test]
    async fn empty_pool_reports_none_available() {
        let store = MemoryLicenseStore::new();

        assert!(matches!(
            store.try_claim("tx-1").await.unwrap(),
            ClaimOutcome::NoneAvailable
        ));
    }
}
