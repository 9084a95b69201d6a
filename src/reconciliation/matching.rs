//! Statement-to-ledger matching engine
//!
//! Scoring is additive over independent signals (date proximity, amount
//! agreement, description similarity), each contributing a human-readable
//! reason. Assignment is greedy and strictly one-to-one: statement lines
//! are processed in input order, earlier lines get first claim, and a
//! claimed ledger transaction is excluded for every later line. Identical
//! inputs always produce the identical partition.

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::traits::LedgerStorage;
use crate::types::*;

/// Days added on each side of the statement period when fetching
/// candidate ledger transactions, covering weekend and settlement drift
pub const MATCH_WINDOW_PADDING_DAYS: i64 = 7;

/// Confidence tier of a statement-to-ledger pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Probable,
    Possible,
    None,
}

/// Classify a score: >=80 exact, >=60 probable, >=40 possible, else none
pub fn match_tier(score: u32) -> MatchTier {
    if score >= 80 {
        MatchTier::Exact
    } else if score >= 60 {
        MatchTier::Probable
    } else if score >= 40 {
        MatchTier::Possible
    } else {
        MatchTier::None
    }
}

/// Score and reasons for one candidate pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u32,
    pub reasons: Vec<String>,
}

/// A claimed statement-to-ledger pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMatch {
    pub statement: StatementTransaction,
    pub transaction: Transaction,
    pub score: u32,
    pub reasons: Vec<String>,
    pub tier: MatchTier,
}

/// Balance-difference summary over one matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Number of statement lines processed
    pub total_statement: usize,
    /// Statement lines that claimed a ledger transaction
    pub total_matched: usize,
    /// Statement lines left unmatched
    pub total_unmatched: usize,
    /// Sum of signed statement amounts
    pub statement_balance: BigDecimal,
    /// Sum of account-scoped posting amounts over the candidate window
    pub ledger_balance: BigDecimal,
    /// statement_balance - ledger_balance
    pub difference: BigDecimal,
}

/// Full partition produced by one matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub exact_matches: Vec<TransactionMatch>,
    pub probable_matches: Vec<TransactionMatch>,
    pub possible_matches: Vec<TransactionMatch>,
    /// Statement lines no candidate reached the possible tier for
    pub unmatched_statement: Vec<StatementTransaction>,
    /// Eligible ledger transactions no statement line claimed
    pub unmatched_ledger: Vec<Transaction>,
    pub summary: MatchSummary,
}

/// Normalize a description for comparison: lowercase, strip everything
/// outside `[a-z0-9 ]`, collapse whitespace
///
/// Comparison-only; normalized text is never persisted.
pub fn normalize_description(s: &str) -> String {
    let lowered: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Symmetric 0-1 similarity ratio between two normalized descriptions
pub fn description_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_description(a);
    let b = normalize_description(b);

    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Score one statement line against one candidate ledger transaction
///
/// The amount signal compares the statement's signed amount against the
/// account-scoped posting sum; the whole-transaction sum is always
/// approximately zero and would carry no information.
pub fn calculate_match_score(
    statement: &StatementTransaction,
    transaction: &Transaction,
    account_id: &str,
) -> MatchScore {
    let mut score = 0;
    let mut reasons = Vec::new();

    let day_delta = (statement.date - transaction.date).num_days().abs();
    if day_delta == 0 {
        score += 40;
        reasons.push("same date".to_string());
    } else if day_delta <= 1 {
        score += 25;
        reasons.push("date within 1 day".to_string());
    } else if day_delta <= 3 {
        score += 15;
        reasons.push(format!("date within {day_delta} days"));
    }

    let amount_delta =
        (statement.signed_amount() - transaction.account_amount(account_id)).abs();
    if amount_delta <= cent_tolerance() {
        score += 30;
        reasons.push("amount matches to the cent".to_string());
    } else if amount_delta <= BigDecimal::from(1) {
        score += 15;
        reasons.push("amount within one dollar".to_string());
    }

    let similarity = description_similarity(&statement.description, &transaction.payee);
    if similarity >= 0.8 {
        score += 20;
        reasons.push(format!("description similarity {similarity:.2}"));
    } else if similarity >= 0.5 {
        score += 10;
        reasons.push(format!("description similarity {similarity:.2}"));
    }

    MatchScore { score, reasons }
}

/// Find the best-scoring non-excluded candidate for one statement line
///
/// Ties break to the earliest ledger date, then to input order. A winner
/// whose tier is below possible is suppressed: no transaction is reported
/// even though a best-of-the-worst existed.
pub fn find_best_match<'a>(
    statement: &StatementTransaction,
    candidates: &'a [Transaction],
    excluded: &HashSet<String>,
    account_id: &str,
) -> Option<(&'a Transaction, MatchScore)> {
    let mut best: Option<(&Transaction, MatchScore)> = None;

    for candidate in candidates {
        if excluded.contains(&candidate.id) {
            continue;
        }
        let scored = calculate_match_score(statement, candidate, account_id);
        let better = match &best {
            None => true,
            Some((current, current_score)) => {
                scored.score > current_score.score
                    || (scored.score == current_score.score && candidate.date < current.date)
            }
        };
        if better {
            best = Some((candidate, scored));
        }
    }

    let (transaction, score) = best?;
    if match_tier(score.score) == MatchTier::None {
        return None;
    }
    Some((transaction, score))
}

/// Sum of account-scoped posting amounts over a set of transactions,
/// skipping voided transactions
pub fn calculate_balance(account_id: &str, transactions: &[Transaction]) -> BigDecimal {
    transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Normal)
        .map(|t| t.account_amount(account_id))
        .sum()
}

/// Pure matching core over an already-fetched candidate pool
///
/// `excluded` carries transaction ids that may never be claimed
/// (previously reconciled); claimed ids are added to it as lines match.
pub fn match_statement_lines(
    account_id: &str,
    statement_txs: &[StatementTransaction],
    candidates: &[Transaction],
    mut excluded: HashSet<String>,
) -> MatchResult {
    let mut exact_matches = Vec::new();
    let mut probable_matches = Vec::new();
    let mut possible_matches = Vec::new();
    let mut unmatched_statement = Vec::new();

    for statement in statement_txs {
        match find_best_match(statement, candidates, &excluded, account_id) {
            Some((transaction, score)) => {
                excluded.insert(transaction.id.clone());
                let tier = match_tier(score.score);
                debug!(
                    statement = %statement.description,
                    transaction = %transaction.id,
                    score = score.score,
                    ?tier,
                    "claimed match"
                );
                let matched = TransactionMatch {
                    statement: statement.clone(),
                    transaction: transaction.clone(),
                    score: score.score,
                    reasons: score.reasons,
                    tier,
                };
                match tier {
                    MatchTier::Exact => exact_matches.push(matched),
                    MatchTier::Probable => probable_matches.push(matched),
                    MatchTier::Possible => possible_matches.push(matched),
                    MatchTier::None => unreachable!("tierless winners are suppressed"),
                }
            }
            None => unmatched_statement.push(statement.clone()),
        }
    }

    // Pre-excluded (already reconciled) transactions are neither claimable
    // nor missing; only never-claimed eligible candidates are reported.
    let unmatched_ledger: Vec<Transaction> = candidates
        .iter()
        .filter(|t| !excluded.contains(&t.id))
        .cloned()
        .collect();

    let total_matched =
        exact_matches.len() + probable_matches.len() + possible_matches.len();
    let statement_balance: BigDecimal =
        statement_txs.iter().map(|s| s.signed_amount()).sum();
    let ledger_balance = calculate_balance(account_id, candidates);
    let difference = &statement_balance - &ledger_balance;

    MatchResult {
        summary: MatchSummary {
            total_statement: statement_txs.len(),
            total_matched,
            total_unmatched: unmatched_statement.len(),
            statement_balance,
            ledger_balance,
            difference,
        },
        exact_matches,
        probable_matches,
        possible_matches,
        unmatched_statement,
        unmatched_ledger,
    }
}

/// Matching engine bound to a storage backend
///
/// Stateless apart from the storage handle; safe to call concurrently for
/// different accounts. Matching itself is sequential because every claim
/// shrinks the candidate pool for later lines.
pub struct MatchingEngine<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> MatchingEngine<S> {
    /// Create a matching engine over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Match statement lines against ledger transactions for one account
    ///
    /// Candidates are fetched over the statement period padded by
    /// [`MATCH_WINDOW_PADDING_DAYS`] on each side; voided transactions and
    /// transactions already reconciled on this account are never claimed.
    pub async fn match_transactions(
        &self,
        account_id: &str,
        statement_txs: &[StatementTransaction],
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> LedgerResult<MatchResult> {
        let padded_start = range_start - Duration::days(MATCH_WINDOW_PADDING_DAYS);
        let padded_end = range_end + Duration::days(MATCH_WINDOW_PADDING_DAYS);

        let candidates: Vec<Transaction> = self
            .storage
            .fetch_transactions(account_id, padded_start, padded_end)
            .await?
            .into_iter()
            .filter(|t| t.status == TransactionStatus::Normal)
            .collect();

        let excluded: HashSet<String> = candidates
            .iter()
            .filter(|t| {
                t.postings
                    .iter()
                    .any(|p| p.account_id == account_id && p.reconciliation_id.is_some())
            })
            .map(|t| t.id.clone())
            .collect();

        Ok(match_statement_lines(
            account_id,
            statement_txs,
            &candidates,
            excluded,
        ))
    }
}
