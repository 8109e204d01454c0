//! PostgreSQL-backed license pool store.
//!
//! This is the production store. Correctness under concurrency comes from
//! two database-level mechanisms, not application logic:
//!
//! 1. The claim is a single conditional `UPDATE` whose candidate row is
//!    selected with `FOR UPDATE SKIP LOCKED` inside the same statement.
//!    Two concurrent claimers either pick different rows or one of them
//!    observes no candidate, never both writing the same row.
//! 2. A partial unique index on `claimed_by_transaction` rejects a second
//!    code for the same transaction even if two duplicate calls race past
//!    the idempotency read. The loser's constraint violation is converted
//!    into a read of the winner's row.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::license::LicenseCode;
use crate::store::{ClaimOutcome, LicenseStore, PoolCounts};

/// License pool store backed by the `license_codes` table.
#[derive(Clone)]
pub struct PgLicenseStore {
    pool: DbPool,
}

impl PgLicenseStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseStore for PgLicenseStore {
    /// Idempotency lookup: the code already bound to this transaction.
    ///
    /// Pure read. Replayed claim requests resolve here without touching
    /// any available row.
    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LicenseCode>, AppError> {
        let existing = sqlx::query_as::<_, LicenseCode>(
            "SELECT * FROM license_codes WHERE claimed_by_transaction = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing)
    }

    /// Attempt the one-way transition of a single available row.
    ///
    /// # Atomicity
    ///
    /// Candidate selection and the write happen in one statement. The inner
    /// `SELECT ... FOR UPDATE SKIP LOCKED` locks the chosen row before the
    /// update applies, and skips rows locked by concurrent claims, so a
    /// "read one row, then write it" window never exists.
    ///
    /// # Outcomes
    ///
    /// - A row came back: this transaction now owns it.
    /// - Unique violation on `claimed_by_transaction`: a duplicate call for
    ///   the same transaction won first; read its row back.
    /// - No row and no available codes: the pool is exhausted.
    /// - No row but available codes exist: every candidate was locked by
    ///   in-flight claims; report contention so the caller can retry.
    async fn try_claim(&self, transaction_id: &str) -> Result<ClaimOutcome, AppError> {
        let claimed = sqlx::query_as::<_, LicenseCode>(
            r#"
            UPDATE license_codes
            SET status = 'claimed',
                claimed_by_transaction = $1,
                claimed_at = NOW()
            WHERE id = (
                SELECT id
                FROM license_codes
                WHERE status = 'available'
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await;

        match claimed {
            Ok(Some(row)) => Ok(ClaimOutcome::Claimed(row)),

            Ok(None) => {
                // No candidate row. Distinguish an empty pool from rows that
                // were all locked by concurrent claims at selection time.
                let any_available: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM license_codes WHERE status = 'available')",
                )
                .fetch_one(&self.pool)
                .await?;

                if any_available {
                    Ok(ClaimOutcome::Contended)
                } else {
                    Ok(ClaimOutcome::NoneAvailable)
                }
            }

            Err(err) if is_unique_violation(&err) => {
                // A duplicate call for this transaction claimed a different
                // row first; the constraint rejected ours. Hand back the
                // winner's row so both callers return the same code.
                match self.find_by_transaction(transaction_id).await? {
                    Some(existing) => Ok(ClaimOutcome::AlreadyClaimed(existing)),
                    None => {
                        // The constraint says this transaction holds a code
                        // but the lookup cannot see it. Surface loudly, never
                        // pick a row on a guess.
                        tracing::error!(
                            "Claim uniqueness fired for transaction {} but no existing claim is readable",
                            transaction_id
                        );
                        Err(AppError::ClaimInvariantViolation)
                    }
                }
            }

            Err(err) => Err(err.into()),
        }
    }

    async fn pool_counts(&self) -> Result<PoolCounts, AppError> {
        let (available, claimed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'available'),
                COUNT(*) FILTER (WHERE status = 'claimed')
            FROM license_codes
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PoolCounts { available, claimed })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Whether a sqlx error is a unique constraint violation (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
