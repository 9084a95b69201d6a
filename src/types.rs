//! Core types and data structures for the ledger system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account types following standard accounting principles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Bank Accounts, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Credit Cards, Loans, GST Collected, etc.)
    Liability,
    /// Equity - owner's interest in the business
    Equity,
    /// Income/Revenue - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

/// Whether an account behaves as a spending category or a transfer counterparty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Category accounts classify income and spending (Groceries, Rent, Sales)
    Category,
    /// Transfer accounts hold real money that statements can be reconciled
    /// against (bank accounts, credit cards)
    Transfer,
}

/// Core account structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Category or Transfer behavior
    pub kind: AccountKind,
    /// Whether postings to this account default to business postings
    pub is_business_default: bool,
    /// Whether business postings to this account default to carrying GST
    pub default_has_gst: bool,
    /// Archived accounts are hidden from entry and cannot start reconciliations
    pub archived: bool,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active account
    pub fn new(id: String, name: String, account_type: AccountType, kind: AccountKind) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            name,
            account_type,
            kind,
            is_business_default: false,
            default_has_gst: false,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the account as a business account whose postings carry GST by default
    pub fn with_business_defaults(mut self) -> Self {
        self.is_business_default = true;
        self.default_has_gst = true;
        self
    }
}

/// Lifecycle status of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Normal posted transaction
    Normal,
    /// Voided transactions are kept for audit but excluded from balances and matching
    Void,
}

/// One signed leg of a double-entry transaction, tied to one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier for the posting
    pub id: String,
    /// Transaction this posting belongs to
    pub transaction_id: String,
    /// Account being affected
    pub account_id: String,
    /// Signed amount; positive increases the account, negative decreases it
    pub amount: BigDecimal,
    /// Whether this posting belongs to the business side of the ledger
    pub is_business: bool,
    /// GST treatment code, when the posting participates in a GST split
    pub gst_code: Option<String>,
    /// GST rate applied (0.1 for the standard 10% rate)
    pub gst_rate: Option<BigDecimal>,
    /// GST portion carried by the paired control-account posting
    pub gst_amount: Option<BigDecimal>,
    /// Whether the posting has been sighted on a bank statement
    pub cleared: bool,
    /// Reconciliation session that claimed this posting, if any
    pub reconciliation_id: Option<String>,
}

impl Posting {
    /// Create a plain (non-GST) posting
    pub fn new(id: String, transaction_id: String, account_id: String, amount: BigDecimal) -> Self {
        Self {
            id,
            transaction_id,
            account_id,
            amount,
            is_business: false,
            gst_code: None,
            gst_rate: None,
            gst_amount: None,
            cleared: false,
            reconciliation_id: None,
        }
    }

    /// Whether this posting carries GST split metadata
    pub fn has_gst(&self) -> bool {
        self.is_business && self.gst_code.is_some()
    }
}

/// Complete double-entry transaction with ordered postings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: String,
    /// Date when the transaction occurred
    pub date: NaiveDate,
    /// Who the money moved to or from
    pub payee: String,
    /// Optional free-text memo
    pub memo: Option<String>,
    /// Arbitrary tags for grouping
    pub tags: Vec<String>,
    /// Normal or Void
    pub status: TransactionStatus,
    /// Opaque metadata carried through by importers
    pub metadata: HashMap<String, String>,
    /// Ordered postings that make up this transaction
    pub postings: Vec<Posting>,
    /// When the transaction was created
    pub created_at: NaiveDateTime,
    /// When the transaction was last updated
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// Create a new empty transaction
    pub fn new(id: String, date: NaiveDate, payee: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            date,
            payee,
            memo: None,
            tags: Vec::new(),
            status: TransactionStatus::Normal,
            metadata: HashMap::new(),
            postings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a posting to the transaction
    pub fn add_posting(&mut self, posting: Posting) {
        self.postings.push(posting);
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Sum of all posting amounts; approximately zero for a valid transaction
    pub fn posting_total(&self) -> BigDecimal {
        self.postings.iter().map(|p| &p.amount).sum()
    }

    /// Signed sum of posting amounts touching the given account
    ///
    /// This is the amount the matching engine compares statement lines
    /// against; the whole-transaction sum is always approximately zero.
    pub fn account_amount(&self, account_id: &str) -> BigDecimal {
        self.postings
            .iter()
            .filter(|p| p.account_id == account_id)
            .map(|p| &p.amount)
            .sum()
    }

    /// Whether any posting touches the given account
    pub fn touches_account(&self, account_id: &str) -> bool {
        self.postings.iter().any(|p| p.account_id == account_id)
    }

    /// Check the double-entry invariant: posting amounts sum to zero within a cent
    pub fn is_balanced(&self) -> bool {
        self.posting_total().abs() <= cent_tolerance()
    }

    /// Validate the transaction invariants
    pub fn validate(&self) -> LedgerResult<()> {
        if self.postings.len() < 2 {
            return Err(LedgerError::Validation(
                "Transaction must have at least two postings for double-entry bookkeeping"
                    .to_string(),
            ));
        }

        if !self.is_balanced() {
            return Err(LedgerError::Validation(format!(
                "Transaction is not balanced: postings sum to {}",
                self.posting_total()
            )));
        }

        for posting in &self.postings {
            if let (Some(rate), Some(gst_amount)) = (&posting.gst_rate, &posting.gst_amount) {
                let gross = posting.amount.abs() + gst_amount.abs();
                if !crate::tax::gst::gst_within_tolerance(&gross, rate, &gst_amount.abs()) {
                    return Err(LedgerError::Validation(format!(
                        "Posting '{}' GST amount {} does not agree with gross {} at rate {}",
                        posting.id, gst_amount, gross, rate
                    )));
                }
            }
        }

        Ok(())
    }
}

/// One parsed bank-statement line item, not yet linked to ledger data
///
/// Statement transactions are created per extraction call and discarded
/// after matching; they are never persisted raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTransaction {
    /// Transaction date as printed on the statement
    pub date: NaiveDate,
    /// Description text, with continuation lines folded in
    pub description: String,
    /// Money leaving the account, when the line is a debit
    pub debit: Option<BigDecimal>,
    /// Money entering the account, when the line is a credit
    pub credit: Option<BigDecimal>,
    /// Running balance printed on the line, when present
    pub balance: Option<BigDecimal>,
    /// The raw statement line(s) this record was parsed from
    pub raw_text: String,
}

impl StatementTransaction {
    /// Signed amount convention: credits positive, debits negative
    ///
    /// Lines up with the signed posting amounts on an asset account, so a
    /// statement debit matches a negative account-scoped posting sum.
    pub fn signed_amount(&self) -> BigDecimal {
        let credit = self.credit.clone().unwrap_or_else(|| BigDecimal::from(0));
        let debit = self.debit.clone().unwrap_or_else(|| BigDecimal::from(0));
        credit - debit
    }
}

/// Statement-level metadata recovered from the header and footer text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementInfo {
    /// Account number as printed, digits and spacing preserved
    pub account_number: Option<String>,
    /// First day of the statement period
    pub period_start: Option<NaiveDate>,
    /// Last day of the statement period
    pub period_end: Option<NaiveDate>,
    /// Balance at the start of the period
    pub opening_balance: Option<BigDecimal>,
    /// Balance at the end of the period
    pub closing_balance: Option<BigDecimal>,
}

/// Lifecycle status of a reconciliation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    /// Postings may still be reconciled and unreconciled
    InProgress,
    /// Terminal; the session and its postings are immutable
    Locked,
}

/// A reconciliation session certifying a statement period against the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Unique identifier for the session
    pub id: String,
    /// Account being reconciled
    pub account_id: String,
    /// First day covered by the statement
    pub statement_start_date: NaiveDate,
    /// Last day covered by the statement
    pub statement_end_date: NaiveDate,
    /// Bank-reported balance at the start of the period
    pub statement_start_balance: BigDecimal,
    /// Bank-reported balance at the end of the period
    pub statement_end_balance: BigDecimal,
    /// InProgress or Locked
    pub status: ReconciliationStatus,
    /// Free-text notes, editable while in progress
    pub notes: Option<String>,
    /// When the session was started
    pub created_at: NaiveDateTime,
    /// When the session was last updated
    pub updated_at: NaiveDateTime,
}

impl Reconciliation {
    /// Net movement the statement reports for the period
    pub fn statement_movement(&self) -> BigDecimal {
        &self.statement_end_balance - &self.statement_start_balance
    }

    /// Whether the session still accepts posting mutations
    pub fn is_open(&self) -> bool {
        self.status == ReconciliationStatus::InProgress
    }
}

/// One-cent tolerance used for balance and GST agreement checks
pub fn cent_tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Errors that can occur in the ledger system
///
/// Statement-extraction problems are deliberately absent: malformed lines
/// are skipped and surface only as lowered extraction confidence.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Posting not found: {0}")]
    PostingNotFound(String),
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
