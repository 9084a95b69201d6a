//! Reconciliation session lifecycle
//!
//! A session moves one way: InProgress to Locked. While in progress it
//! stamps and clears postings; once balanced it can be locked, after which
//! the storage layer rejects every mutation to its postings. Session
//! mutations take `&mut self`, giving single-writer discipline per
//! manager; different accounts run independently.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::traits::LedgerStorage;
use crate::types::*;

/// On-demand balance summary for a reconciliation session
///
/// Always recomputed from current posting state, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Net movement the statement reports (closing minus opening balance)
    pub statement_balance: BigDecimal,
    /// Sum of account-scoped amounts of postings claimed by this session
    pub cleared_balance: BigDecimal,
    /// Sum of account-scoped amounts of unclaimed postings in the period
    pub unreconciled_balance: BigDecimal,
    /// statement_balance - cleared_balance
    pub difference: BigDecimal,
    /// Whether the difference is inside the one-cent tolerance
    pub is_balanced: bool,
    /// Postings claimed by this session
    pub reconciled_count: usize,
    /// Unclaimed postings in the period
    pub unreconciled_count: usize,
}

/// Manager driving reconciliation sessions over a storage backend
pub struct ReconciliationManager<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> ReconciliationManager<S> {
    /// Create a new reconciliation manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Start a reconciliation session for an account
    ///
    /// Fails with a conflict if an in-progress session already exists for
    /// the account; archived accounts cannot start sessions.
    pub async fn start(
        &mut self,
        account_id: &str,
        statement_start_date: NaiveDate,
        statement_end_date: NaiveDate,
        statement_start_balance: BigDecimal,
        statement_end_balance: BigDecimal,
    ) -> LedgerResult<Reconciliation> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        if account.archived {
            return Err(LedgerError::Validation(format!(
                "Account '{}' is archived and cannot be reconciled",
                account_id
            )));
        }

        if let Some(existing) = self.storage.find_in_progress(account_id).await? {
            return Err(LedgerError::Conflict(format!(
                "Reconciliation '{}' is already in progress for account '{}'",
                existing.id, account_id
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        let reconciliation = Reconciliation {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            statement_start_date,
            statement_end_date,
            statement_start_balance,
            statement_end_balance,
            status: ReconciliationStatus::InProgress,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.save_reconciliation(&reconciliation).await?;

        info!(
            reconciliation = %reconciliation.id,
            account = %account_id,
            "started reconciliation session"
        );
        Ok(reconciliation)
    }

    async fn get_required(&self, reconciliation_id: &str) -> LedgerResult<Reconciliation> {
        self.storage
            .get_reconciliation(reconciliation_id)
            .await?
            .ok_or_else(|| LedgerError::ReconciliationNotFound(reconciliation_id.to_string()))
    }

    fn require_open(reconciliation: &Reconciliation) -> LedgerResult<()> {
        if !reconciliation.is_open() {
            return Err(LedgerError::Conflict(format!(
                "Reconciliation '{}' is locked",
                reconciliation.id
            )));
        }
        Ok(())
    }

    /// Stamp postings with this session and mark them cleared
    pub async fn reconcile_postings(
        &mut self,
        reconciliation_id: &str,
        posting_ids: &[String],
    ) -> LedgerResult<()> {
        let reconciliation = self.get_required(reconciliation_id).await?;
        Self::require_open(&reconciliation)?;

        for posting_id in posting_ids {
            let posting = self
                .storage
                .get_posting(posting_id)
                .await?
                .ok_or_else(|| LedgerError::PostingNotFound(posting_id.to_string()))?;

            if posting.account_id != reconciliation.account_id {
                return Err(LedgerError::Validation(format!(
                    "Posting '{}' is on account '{}', not the reconciled account '{}'",
                    posting_id, posting.account_id, reconciliation.account_id
                )));
            }

            self.storage
                .reconcile_posting(posting_id, reconciliation_id)
                .await?;
        }

        Ok(())
    }

    /// Release postings previously claimed by this session
    pub async fn unreconcile_postings(
        &mut self,
        reconciliation_id: &str,
        posting_ids: &[String],
    ) -> LedgerResult<()> {
        let reconciliation = self.get_required(reconciliation_id).await?;
        Self::require_open(&reconciliation)?;

        for posting_id in posting_ids {
            let posting = self
                .storage
                .get_posting(posting_id)
                .await?
                .ok_or_else(|| LedgerError::PostingNotFound(posting_id.to_string()))?;

            if posting.reconciliation_id.as_deref() != Some(reconciliation_id) {
                return Err(LedgerError::Validation(format!(
                    "Posting '{}' is not reconciled under session '{}'",
                    posting_id, reconciliation_id
                )));
            }

            self.storage.unreconcile_posting(posting_id).await?;
        }

        Ok(())
    }

    /// Replace the session notes
    pub async fn set_notes(
        &mut self,
        reconciliation_id: &str,
        notes: Option<String>,
    ) -> LedgerResult<()> {
        let mut reconciliation = self.get_required(reconciliation_id).await?;
        Self::require_open(&reconciliation)?;

        reconciliation.notes = notes;
        reconciliation.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_reconciliation(&reconciliation).await
    }

    /// Compute the session's balance summary from current posting state
    pub async fn status(&self, reconciliation_id: &str) -> LedgerResult<SessionStatus> {
        let reconciliation = self.get_required(reconciliation_id).await?;

        let transactions = self
            .storage
            .fetch_transactions(
                &reconciliation.account_id,
                reconciliation.statement_start_date,
                reconciliation.statement_end_date,
            )
            .await?;

        let mut cleared_balance = BigDecimal::from(0);
        let mut unreconciled_balance = BigDecimal::from(0);
        let mut reconciled_count = 0;
        let mut unreconciled_count = 0;

        for transaction in &transactions {
            if transaction.status != TransactionStatus::Normal {
                continue;
            }
            for posting in &transaction.postings {
                if posting.account_id != reconciliation.account_id {
                    continue;
                }
                match posting.reconciliation_id.as_deref() {
                    Some(id) if id == reconciliation_id => {
                        cleared_balance += &posting.amount;
                        reconciled_count += 1;
                    }
                    // Claimed by an earlier session: out of scope here
                    Some(_) => {}
                    None => {
                        unreconciled_balance += &posting.amount;
                        unreconciled_count += 1;
                    }
                }
            }
        }

        let statement_balance = reconciliation.statement_movement();
        let difference = &statement_balance - &cleared_balance;
        let is_balanced = difference.abs() < cent_tolerance();

        Ok(SessionStatus {
            statement_balance,
            cleared_balance,
            unreconciled_balance,
            difference,
            is_balanced,
            reconciled_count,
            unreconciled_count,
        })
    }

    /// Lock the session, certifying the balance agreement
    ///
    /// Succeeds only when the session is balanced at call time. Locking is
    /// one-way; afterwards the storage layer rejects every mutation of the
    /// postings this session claimed.
    pub async fn lock(&mut self, reconciliation_id: &str) -> LedgerResult<Reconciliation> {
        let mut reconciliation = self.get_required(reconciliation_id).await?;
        Self::require_open(&reconciliation)?;

        let status = self.status(reconciliation_id).await?;
        if !status.is_balanced {
            return Err(LedgerError::Conflict(format!(
                "Cannot lock reconciliation '{}': difference {} exceeds tolerance",
                reconciliation_id, status.difference
            )));
        }

        reconciliation.status = ReconciliationStatus::Locked;
        reconciliation.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_reconciliation(&reconciliation).await?;

        info!(
            reconciliation = %reconciliation.id,
            account = %reconciliation.account_id,
            "locked reconciliation session"
        );
        Ok(reconciliation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::patterns;
    use crate::traits::LedgerStorage;
    use crate::utils::MemoryStorage;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_storage() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .save_account(&Account::new(
                "bank".to_string(),
                "Everyday Account".to_string(),
                AccountType::Asset,
                AccountKind::Transfer,
            ))
            .await
            .unwrap();
        storage
            .save_account(&Account::new(
                "groceries".to_string(),
                "Groceries".to_string(),
                AccountType::Expense,
                AccountKind::Category,
            ))
            .await
            .unwrap();

        let txn = patterns::create_expense(
            "t1".to_string(),
            date(2025, 1, 15),
            "Woolworths".to_string(),
            "bank".to_string(),
            "groceries".to_string(),
            dec("125.50"),
        )
        .unwrap();
        storage.save_transaction(&txn).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_start_conflicts_with_existing_session() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        let second = manager
            .start(
                "bank",
                date(2025, 2, 1),
                date(2025, 2, 28),
                dec("874.50"),
                dec("874.50"),
            )
            .await;
        assert!(matches!(second, Err(LedgerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_start_unknown_account() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let result = manager
            .start(
                "nope",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("0"),
                dec("0"),
            )
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_reconcile_then_status_balances() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let session = manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        let before = manager.status(&session.id).await.unwrap();
        assert!(!before.is_balanced);
        assert_eq!(before.unreconciled_count, 1);
        assert_eq!(before.unreconciled_balance, dec("-125.50"));

        manager
            .reconcile_postings(&session.id, &["t1-p1".to_string()])
            .await
            .unwrap();

        let after = manager.status(&session.id).await.unwrap();
        assert!(after.is_balanced);
        assert_eq!(after.cleared_balance, dec("-125.50"));
        assert_eq!(after.reconciled_count, 1);
        assert_eq!(after.unreconciled_count, 0);
    }

    #[tokio::test]
    async fn test_unreconcile_requires_session_ownership() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let session = manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        let result = manager
            .unreconcile_postings(&session.id, &["t1-p1".to_string()])
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_lock_rejects_unbalanced_session() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let session = manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        let result = manager.lock(&session.id).await;
        assert!(matches!(result, Err(LedgerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lock_then_postings_are_immutable() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let session = manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        manager
            .reconcile_postings(&session.id, &["t1-p1".to_string()])
            .await
            .unwrap();
        let locked = manager.lock(&session.id).await.unwrap();
        assert_eq!(locked.status, ReconciliationStatus::Locked);

        // Session-level operations now conflict
        let via_session = manager
            .reconcile_postings(&session.id, &["t1-p1".to_string()])
            .await;
        assert!(matches!(via_session, Err(LedgerError::Conflict(_))));

        // And the storage layer itself rejects direct mutation
        let mut storage = seeded_storage().await;
        storage
            .save_reconciliation(&locked)
            .await
            .unwrap();
        let mut txn = storage.get_transaction("t1").await.unwrap().unwrap();
        txn.postings[0].reconciliation_id = Some(locked.id.clone());
        storage.save_transaction(&txn).await.unwrap();
        let direct = storage.unreconcile_posting("t1-p1").await;
        assert!(matches!(direct, Err(LedgerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_set_notes_only_while_open() {
        let storage = seeded_storage().await;
        let mut manager = ReconciliationManager::new(storage);

        let session = manager
            .start(
                "bank",
                date(2025, 1, 1),
                date(2025, 1, 31),
                dec("1000.00"),
                dec("874.50"),
            )
            .await
            .unwrap();

        manager
            .set_notes(&session.id, Some("awaiting card settlement".to_string()))
            .await
            .unwrap();

        manager
            .reconcile_postings(&session.id, &["t1-p1".to_string()])
            .await
            .unwrap();
        manager.lock(&session.id).await.unwrap();

        let result = manager.set_notes(&session.id, None).await;
        assert!(matches!(result, Err(LedgerError::Conflict(_))));
    }
}
