//! Bank statement parsing: format detection, metadata and transaction
//! extraction, and advisory confidence scoring
//!
//! The extractor is a pure, stateless transform over raw statement text
//! (PDF-extracted or CSV-flattened upstream). It performs no I/O and never
//! fails: unrecognized lines are skipped and an empty extraction is a
//! valid, low-confidence result.

pub mod extract;
pub mod format;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use extract::{
    balances_are_consistent, extract_transactions, is_debit_description, parse_amount, parse_date,
};
pub use format::{extract_statement_info, BankFormat};

use crate::types::{StatementInfo, StatementTransaction};

/// Advisory extraction quality; never blocks downstream use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionConfidence {
    High,
    Medium,
    Low,
}

/// Result of parsing one raw statement text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    /// The detected layout
    pub format: BankFormat,
    /// Statement-level metadata; any field may be absent
    pub info: StatementInfo,
    /// Ordered transactions as they appear on the statement
    pub transactions: Vec<StatementTransaction>,
    /// Advisory extraction quality
    pub confidence: ExtractionConfidence,
}

/// Additive confidence score backing [`assess_confidence`]
pub fn confidence_score(info: &StatementInfo, transactions: &[StatementTransaction]) -> u32 {
    let mut score = 0;

    if info.account_number.is_some() {
        score += 20;
    }
    if info.period_start.is_some() && info.period_end.is_some() {
        score += 20;
    }
    if info.opening_balance.is_some() {
        score += 10;
    }
    if info.closing_balance.is_some() {
        score += 10;
    }

    if !transactions.is_empty() {
        score += 20;
        if transactions.len() > 10 {
            score += 10;
        }
        let with_balance = transactions.iter().filter(|t| t.balance.is_some()).count();
        if with_balance * 10 >= transactions.len() * 8 {
            score += 10;
        }
    }

    score
}

/// Score an extraction: >=70 is high, >=40 medium, otherwise low
pub fn assess_confidence(
    info: &StatementInfo,
    transactions: &[StatementTransaction],
) -> ExtractionConfidence {
    let score = confidence_score(info, transactions);
    if score >= 70 {
        ExtractionConfidence::High
    } else if score >= 40 {
        ExtractionConfidence::Medium
    } else {
        ExtractionConfidence::Low
    }
}

/// Parse raw statement text into metadata, transactions, and a confidence
pub fn parse_statement(raw_text: &str) -> ParsedStatement {
    let format = BankFormat::detect(raw_text);
    let info = extract_statement_info(raw_text, format);
    let transactions = extract_transactions(raw_text, format);
    let confidence = assess_confidence(&info, &transactions);

    debug!(
        format = format.label(),
        transactions = transactions.len(),
        ?confidence,
        "parsed statement"
    );

    ParsedStatement {
        format,
        info,
        transactions,
        confidence,
    }
}
