//! GST split arithmetic walkthrough

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use ledger_core::{default_gst_rate, gross_to_exclusive, patterns};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Ledger Core - GST Split Example\n");

    // 1. The shared split function used by every ingestion path
    for gross in ["110.00", "125.50", "19.95", "0.05"] {
        let split = gross_to_exclusive(&BigDecimal::from_str(gross)?, &default_gst_rate());
        println!(
            "  gross {:>8} -> exclusive {:>8}, GST {:>6}",
            gross, split.exclusive, split.gst
        );
    }
    println!();

    // 2. A business purchase posting pair built from the split
    let purchase = patterns::create_business_purchase_with_gst(
        "demo1".to_string(),
        NaiveDate::from_ymd_opt(2025, 1, 22).ok_or("bad date")?,
        "Officeworks".to_string(),
        "bank".to_string(),
        "office-supplies".to_string(),
        "gst-paid".to_string(),
        BigDecimal::from_str("125.50")?,
        default_gst_rate(),
    )?;

    println!("💼 Business purchase of $125.50 splits into:");
    for posting in &purchase.postings {
        println!("  {:<18} {:>8}", posting.account_id, posting.amount);
    }
    println!(
        "\n  postings sum to {} (cash movement preserved)",
        purchase.posting_total()
    );

    Ok(())
}
