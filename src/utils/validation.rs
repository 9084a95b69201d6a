//! Validation utilities for entry input
//!
//! Entry lines are how transactions are captured: each line names either a
//! category or a transfer counterparty account, never both and never
//! neither. Violations across a batch of lines are joined into one
//! human-readable message so the caller can surface a single explainer.

use bigdecimal::BigDecimal;

use crate::types::*;

/// One line of a transaction as captured at entry time
#[derive(Debug, Clone, PartialEq)]
pub struct EntryLine {
    /// Signed amount for the line
    pub amount: BigDecimal,
    /// Category account, for categorized income/spending
    pub category_id: Option<String>,
    /// Transfer counterparty account, for account-to-account movements
    pub transfer_account_id: Option<String>,
}

impl EntryLine {
    /// A line categorizing the movement
    pub fn category(amount: BigDecimal, category_id: String) -> Self {
        Self {
            amount,
            category_id: Some(category_id),
            transfer_account_id: None,
        }
    }

    /// A line moving money to another account
    pub fn transfer(amount: BigDecimal, transfer_account_id: String) -> Self {
        Self {
            amount,
            category_id: None,
            transfer_account_id: Some(transfer_account_id),
        }
    }

    /// The account this line posts to, when the line is well-formed
    pub fn target_account(&self) -> Option<&str> {
        match (&self.category_id, &self.transfer_account_id) {
            (Some(category), None) => Some(category),
            (None, Some(transfer)) => Some(transfer),
            _ => None,
        }
    }
}

/// Validate a batch of entry lines, joining every problem into one message
pub fn validate_entry_lines(lines: &[EntryLine]) -> LedgerResult<()> {
    let mut problems = Vec::new();

    if lines.is_empty() {
        problems.push("at least one line is required".to_string());
    }

    for (index, line) in lines.iter().enumerate() {
        let position = index + 1;
        match (&line.category_id, &line.transfer_account_id) {
            (Some(_), Some(_)) => problems.push(format!(
                "line {position} names both a category and a transfer account"
            )),
            (None, None) => problems.push(format!(
                "line {position} names neither a category nor a transfer account"
            )),
            _ => {}
        }
        if line.amount == BigDecimal::from(0) {
            problems.push(format!("line {position} has a zero amount"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::Validation(problems.join("; ")))
    }
}

/// Transaction validator that also enforces entry-level hygiene
///
/// On top of the double-entry invariants: a non-empty payee and unique
/// posting ids.
pub struct StrictTransactionValidator;

impl crate::traits::TransactionValidator for StrictTransactionValidator {
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()> {
        transaction.validate()?;

        if transaction.payee.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Transaction payee cannot be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for posting in &transaction.postings {
            if !seen.insert(&posting.id) {
                return Err(LedgerError::Validation(format!(
                    "Posting id '{}' appears more than once in transaction",
                    posting.id
                )));
            }
        }

        Ok(())
    }
}
