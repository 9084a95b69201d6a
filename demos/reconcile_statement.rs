//! Statement-to-lock reconciliation walkthrough

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use ledger_core::utils::MemoryStorage;
use ledger_core::{
    parse_statement, patterns, Account, AccountKind, AccountType, LedgerStorage, MatchingEngine,
    ReconciliationManager, TransactionBuilder, TransactionManager,
};

const STATEMENT_TEXT: &str = "\
Commonwealth Bank of Australia
Account Number: 06 2000 12345678
Statement Period: 01/01/2025 to 31/01/2025
Opening Balance: $1,000.00 CR
Closing Balance: $3,374.50 CR

Date Transaction Debit Credit Balance
15/01/2025 EFTPOS WOOLWORTHS 125.50 874.50 CR
16/01/2025 Salary ACME PTY LTD $2,500.00 3,374.50 CR
CLOSING BALANCE 3,374.50 CR
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Ledger Core - Bank Reconciliation Example\n");

    // 1. Set up accounts and some ledger history
    let mut storage = MemoryStorage::new();
    for (id, name, account_type, kind) in [
        ("bank", "Everyday Account", AccountType::Asset, AccountKind::Transfer),
        ("groceries", "Groceries", AccountType::Expense, AccountKind::Category),
        ("wages", "Wages", AccountType::Income, AccountKind::Category),
    ] {
        storage
            .save_account(&Account::new(
                id.to_string(),
                name.to_string(),
                account_type,
                kind,
            ))
            .await?;
    }

    let mut transactions = TransactionManager::new(storage.clone());
    transactions
        .record_transaction(patterns::create_expense(
            "t1".to_string(),
            NaiveDate::from_ymd_opt(2025, 1, 15).ok_or("bad date")?,
            "Woolworths".to_string(),
            "bank".to_string(),
            "groceries".to_string(),
            BigDecimal::from_str("125.50")?,
        )?)
        .await?;
    transactions
        .record_transaction(
            TransactionBuilder::new(
                "t2".to_string(),
                NaiveDate::from_ymd_opt(2025, 1, 16).ok_or("bad date")?,
                "Salary ACME PTY LTD".to_string(),
            )
            .posting("bank".to_string(), BigDecimal::from_str("2500.00")?)
            .posting("wages".to_string(), BigDecimal::from_str("-2500.00")?)
            .build()?,
        )
        .await?;
    println!("📒 Recorded 2 ledger transactions\n");

    // 2. Parse the raw statement text
    let parsed = parse_statement(STATEMENT_TEXT);
    println!(
        "📄 Parsed statement: format={}, {} transactions, confidence={:?}",
        parsed.format.label(),
        parsed.transactions.len(),
        parsed.confidence
    );
    for tx in &parsed.transactions {
        println!(
            "  {} {} debit={:?} credit={:?}",
            tx.date, tx.description, tx.debit, tx.credit
        );
    }
    println!();

    // 3. Match statement lines against the ledger
    let engine = MatchingEngine::new(storage.clone());
    let result = engine
        .match_transactions(
            "bank",
            &parsed.transactions,
            parsed.info.period_start.ok_or("no period")?,
            parsed.info.period_end.ok_or("no period")?,
        )
        .await?;

    println!("🔍 Matching results:");
    for matched in &result.exact_matches {
        println!(
            "  ✓ '{}' -> '{}' (score {}: {})",
            matched.statement.description,
            matched.transaction.payee,
            matched.score,
            matched.reasons.join(", ")
        );
    }
    println!(
        "  {} exact, {} probable, {} possible, {} unmatched",
        result.exact_matches.len(),
        result.probable_matches.len(),
        result.possible_matches.len(),
        result.unmatched_statement.len()
    );
    println!("  summary difference: {}\n", result.summary.difference);

    // 4. Reconcile the matched postings and lock the session
    let mut sessions = ReconciliationManager::new(storage);
    let session = sessions
        .start(
            "bank",
            NaiveDate::from_ymd_opt(2025, 1, 1).ok_or("bad date")?,
            NaiveDate::from_ymd_opt(2025, 1, 31).ok_or("bad date")?,
            BigDecimal::from_str("1000.00")?,
            BigDecimal::from_str("3374.50")?,
        )
        .await?;

    let posting_ids: Vec<String> = result
        .exact_matches
        .iter()
        .flat_map(|m| m.transaction.postings.iter())
        .filter(|p| p.account_id == "bank")
        .map(|p| p.id.clone())
        .collect();
    sessions.reconcile_postings(&session.id, &posting_ids).await?;

    let status = sessions.status(&session.id).await?;
    println!(
        "⚖️  Session status: statement={} cleared={} difference={} balanced={}",
        status.statement_balance, status.cleared_balance, status.difference, status.is_balanced
    );

    let locked = sessions.lock(&session.id).await?;
    println!("🔒 Locked reconciliation {:?}", locked.id);

    Ok(())
}
