//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Enforces the lock contract: posting mutations under a Locked
/// reconciliation are rejected with a conflict.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    reconciliations: Arc<RwLock<HashMap<String, Reconciliation>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            reconciliations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
        self.reconciliations.write().unwrap().clear();
    }

    fn find_posting(&self, posting_id: &str) -> Option<(String, Posting)> {
        let transactions = self.transactions.read().unwrap();
        for transaction in transactions.values() {
            if let Some(posting) = transaction.postings.iter().find(|p| p.id == posting_id) {
                return Some((transaction.id.clone(), posting.clone()));
            }
        }
        None
    }

    fn reject_if_locked(&self, posting: &Posting) -> LedgerResult<()> {
        if let Some(reconciliation_id) = &posting.reconciliation_id {
            let reconciliations = self.reconciliations.read().unwrap();
            if let Some(reconciliation) = reconciliations.get(reconciliation_id) {
                if reconciliation.status == ReconciliationStatus::Locked {
                    return Err(LedgerError::Conflict(format!(
                        "Posting '{}' belongs to locked reconciliation '{}'",
                        posting.id, reconciliation_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn mutate_posting<F>(&mut self, posting_id: &str, mutate: F) -> LedgerResult<()>
    where
        F: FnOnce(&mut Posting),
    {
        let (transaction_id, posting) = self
            .find_posting(posting_id)
            .ok_or_else(|| LedgerError::PostingNotFound(posting_id.to_string()))?;
        self.reject_if_locked(&posting)?;

        let mut transactions = self.transactions.write().unwrap();
        let transaction = transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.clone()))?;
        let posting = transaction
            .postings
            .iter_mut()
            .find(|p| p.id == posting_id)
            .ok_or_else(|| LedgerError::PostingNotFound(posting_id.to_string()))?;
        mutate(posting);
        transaction.updated_at = chrono::Utc::now().naive_utc();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(account_id).cloned())
    }

    async fn save_transaction(&mut self, transaction: &Transaction) -> LedgerResult<()> {
        self.transactions
            .write()
            .unwrap()
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .get(transaction_id)
            .cloned())
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.transactions.read().unwrap();
        let mut filtered: Vec<Transaction> = transactions
            .values()
            .filter(|txn| {
                txn.touches_account(account_id)
                    && txn.date >= start_date
                    && txn.date <= end_date
            })
            .cloned()
            .collect();
        // Stable ordering keeps matching deterministic
        filtered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn get_posting(&self, posting_id: &str) -> LedgerResult<Option<Posting>> {
        Ok(self.find_posting(posting_id).map(|(_, posting)| posting))
    }

    async fn reconcile_posting(
        &mut self,
        posting_id: &str,
        reconciliation_id: &str,
    ) -> LedgerResult<()> {
        let reconciliation_id = reconciliation_id.to_string();
        self.mutate_posting(posting_id, |posting| {
            posting.reconciliation_id = Some(reconciliation_id);
            posting.cleared = true;
        })
    }

    async fn unreconcile_posting(&mut self, posting_id: &str) -> LedgerResult<()> {
        self.mutate_posting(posting_id, |posting| {
            posting.reconciliation_id = None;
            posting.cleared = false;
        })
    }

    async fn mark_cleared(&mut self, posting_id: &str, cleared: bool) -> LedgerResult<()> {
        self.mutate_posting(posting_id, |posting| {
            posting.cleared = cleared;
        })
    }

    async fn save_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()> {
        self.reconciliations
            .write()
            .unwrap()
            .insert(reconciliation.id.clone(), reconciliation.clone());
        Ok(())
    }

    async fn get_reconciliation(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Option<Reconciliation>> {
        Ok(self
            .reconciliations
            .read()
            .unwrap()
            .get(reconciliation_id)
            .cloned())
    }

    async fn update_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()> {
        let mut reconciliations = self.reconciliations.write().unwrap();
        if reconciliations.contains_key(&reconciliation.id) {
            reconciliations.insert(reconciliation.id.clone(), reconciliation.clone());
            Ok(())
        } else {
            Err(LedgerError::ReconciliationNotFound(
                reconciliation.id.clone(),
            ))
        }
    }

    async fn find_in_progress(&self, account_id: &str) -> LedgerResult<Option<Reconciliation>> {
        Ok(self
            .reconciliations
            .read()
            .unwrap()
            .values()
            .find(|r| {
                r.account_id == account_id && r.status == ReconciliationStatus::InProgress
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_transaction(id: &str, d: chrono::NaiveDate) -> Transaction {
        let mut txn = Transaction::new(id.to_string(), d, "Payee".to_string());
        txn.add_posting(Posting::new(
            format!("{id}-p1"),
            id.to_string(),
            "bank".to_string(),
            dec("-50.00"),
        ));
        txn.add_posting(Posting::new(
            format!("{id}-p2"),
            id.to_string(),
            "expenses".to_string(),
            dec("50.00"),
        ));
        txn
    }

    #[tokio::test]
    async fn test_fetch_transactions_is_ordered_and_windowed() {
        let mut storage = MemoryStorage::new();
        storage
            .save_transaction(&sample_transaction("b", date(2025, 1, 10)))
            .await
            .unwrap();
        storage
            .save_transaction(&sample_transaction("a", date(2025, 1, 10)))
            .await
            .unwrap();
        storage
            .save_transaction(&sample_transaction("c", date(2025, 3, 1)))
            .await
            .unwrap();

        let fetched = storage
            .fetch_transactions("bank", date(2025, 1, 1), date(2025, 1, 31))
            .await
            .unwrap();
        let ids: Vec<_> = fetched.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_posting_mutation_roundtrip() {
        let mut storage = MemoryStorage::new();
        storage
            .save_transaction(&sample_transaction("t1", date(2025, 1, 10)))
            .await
            .unwrap();

        storage.reconcile_posting("t1-p1", "rec-1").await.unwrap();
        let posting = storage.get_posting("t1-p1").await.unwrap().unwrap();
        assert_eq!(posting.reconciliation_id.as_deref(), Some("rec-1"));
        assert!(posting.cleared);

        storage.unreconcile_posting("t1-p1").await.unwrap();
        let posting = storage.get_posting("t1-p1").await.unwrap().unwrap();
        assert_eq!(posting.reconciliation_id, None);
        assert!(!posting.cleared);
    }

    #[tokio::test]
    async fn test_unknown_posting_is_not_found() {
        let mut storage = MemoryStorage::new();
        let result = storage.reconcile_posting("missing", "rec-1").await;
        assert!(matches!(result, Err(LedgerError::PostingNotFound(_))));
    }

    #[tokio::test]
    async fn test_locked_reconciliation_freezes_postings() {
        let mut storage = MemoryStorage::new();
        storage
            .save_transaction(&sample_transaction("t1", date(2025, 1, 10)))
            .await
            .unwrap();

        let now = chrono::Utc::now().naive_utc();
        let reconciliation = Reconciliation {
            id: "rec-1".to_string(),
            account_id: "bank".to_string(),
            statement_start_date: date(2025, 1, 1),
            statement_end_date: date(2025, 1, 31),
            statement_start_balance: dec("0"),
            statement_end_balance: dec("-50.00"),
            status: ReconciliationStatus::InProgress,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        storage.save_reconciliation(&reconciliation).await.unwrap();
        storage.reconcile_posting("t1-p1", "rec-1").await.unwrap();

        let locked = Reconciliation {
            status: ReconciliationStatus::Locked,
            ..reconciliation
        };
        storage.update_reconciliation(&locked).await.unwrap();

        assert!(matches!(
            storage.unreconcile_posting("t1-p1").await,
            Err(LedgerError::Conflict(_))
        ));
        assert!(matches!(
            storage.reconcile_posting("t1-p1", "rec-2").await,
            Err(LedgerError::Conflict(_))
        ));
        assert!(matches!(
            storage.mark_cleared("t1-p1", false).await,
            Err(LedgerError::Conflict(_))
        ));
    }
}
