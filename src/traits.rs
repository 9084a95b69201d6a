//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::*;

/// Storage abstraction for the ledger system
///
/// This trait allows the reconciliation core to work with any storage
/// backend (PostgreSQL, SQLite, in-memory, etc.) by implementing these
/// methods. The matching engine and reconciliation manager receive an
/// implementation at construction; swapping stores means passing a
/// different implementation, never mutating shared global state.
///
/// Contract for posting mutations: implementations MUST reject
/// `reconcile_posting`, `unreconcile_posting`, and `mark_cleared` with
/// [`LedgerError::Conflict`] when the posting is owned by a
/// [`ReconciliationStatus::Locked`] reconciliation. Lock immutability is
/// enforced at this boundary.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Save an account to storage
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Save a transaction to storage
    async fn save_transaction(&mut self, transaction: &Transaction) -> LedgerResult<()>;

    /// Get a transaction by ID
    async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>>;

    /// List transactions touching an account within a date range, ordered
    /// by date then id
    ///
    /// The ordering guarantee is what makes matching deterministic across
    /// identical calls.
    async fn fetch_transactions(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Get a posting by ID
    async fn get_posting(&self, posting_id: &str) -> LedgerResult<Option<Posting>>;

    /// Stamp a posting with a reconciliation id and mark it cleared
    async fn reconcile_posting(
        &mut self,
        posting_id: &str,
        reconciliation_id: &str,
    ) -> LedgerResult<()>;

    /// Clear a posting's reconciliation id and cleared flag
    async fn unreconcile_posting(&mut self, posting_id: &str) -> LedgerResult<()>;

    /// Set a posting's cleared flag without touching its reconciliation id
    async fn mark_cleared(&mut self, posting_id: &str, cleared: bool) -> LedgerResult<()>;

    /// Save a new reconciliation session
    async fn save_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()>;

    /// Get a reconciliation session by ID
    async fn get_reconciliation(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Option<Reconciliation>>;

    /// Update an existing reconciliation session
    async fn update_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()>;

    /// Find the in-progress reconciliation for an account, if one exists
    ///
    /// At most one session per account may be in progress at a time; the
    /// manager relies on this lookup to enforce that.
    async fn find_in_progress(&self, account_id: &str) -> LedgerResult<Option<Reconciliation>>;
}

/// Trait for implementing custom transaction validation rules
pub trait TransactionValidator: Send + Sync {
    /// Validate a transaction before saving
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()>;
}

/// Default transaction validator enforcing the double-entry invariants
pub struct DefaultTransactionValidator;

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()> {
        transaction.validate()
    }
}
