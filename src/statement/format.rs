//! Bank statement formats: detection and metadata extraction
//!
//! Formats are a closed variant set; supporting a new bank means adding a
//! variant and its signature phrases, not editing a shared cascade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::statement::extract::{parse_amount, parse_date};
use crate::types::StatementInfo;

/// The closed set of recognized statement layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankFormat {
    /// Commonwealth Bank credit card statements; payments carry a trailing `-`
    CommbankCreditCard,
    /// Commonwealth Bank savings/transaction accounts; deposits carry a `$`
    CommbankSavings,
    /// Westpac savings/transaction accounts; credits carry a `CR` suffix
    WestpacSavings,
    /// Fallback for unrecognized layouts
    Generic,
}

static ACCOUNT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)account number[:\s]+([0-9][0-9 \-]{4,}[0-9])").expect("valid regex")
});

static CARD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)card number[:\s]+([0-9][0-9 ]{10,}[0-9])").expect("valid regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:statement\s+)?period[:\s]+(.+?)\s+(?:to|-|–)\s+(.+)").expect("valid regex")
});

static OPENING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:opening balance|balance brought forward|previous balance)[:\s]+(\$?-?[\d,]+(?:\.\d{1,2})?)(?:\s*(cr|dr))?",
    )
    .expect("valid regex")
});

static CLOSING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:closing balance|balance carried forward|new balance)[:\s]+(\$?-?[\d,]+(?:\.\d{1,2})?)(?:\s*(cr|dr))?",
    )
    .expect("valid regex")
});

impl BankFormat {
    /// Detect the statement format from signature phrases
    ///
    /// Checked in fixed precedence order: credit-card indicators before
    /// savings indicators, because savings-account phrases co-occur on
    /// credit-card statements.
    pub fn detect(text: &str) -> BankFormat {
        let lower = text.to_lowercase();
        let commbank = lower.contains("commonwealth bank") || lower.contains("commbank");

        if commbank
            && (lower.contains("credit card")
                || lower.contains("awards card")
                || lower.contains("mastercard"))
        {
            return BankFormat::CommbankCreditCard;
        }
        if commbank || lower.contains("netbank") || lower.contains("smart access") {
            return BankFormat::CommbankSavings;
        }
        if lower.contains("westpac") {
            return BankFormat::WestpacSavings;
        }

        BankFormat::Generic
    }

    /// Short label for logging and display
    pub fn label(&self) -> &'static str {
        match self {
            BankFormat::CommbankCreditCard => "commbank-credit-card",
            BankFormat::CommbankSavings => "commbank-savings",
            BankFormat::WestpacSavings => "westpac-savings",
            BankFormat::Generic => "generic",
        }
    }

    /// Whether a line marks the start of the transaction section
    pub(crate) fn is_section_header(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        match self {
            BankFormat::CommbankCreditCard => {
                lower.contains("date") && lower.contains("transaction") && lower.contains("amount")
            }
            BankFormat::CommbankSavings => {
                lower.contains("date") && lower.contains("transaction") && lower.contains("balance")
            }
            BankFormat::WestpacSavings => {
                lower.contains("date") && lower.contains("description") && lower.contains("balance")
            }
            BankFormat::Generic => false,
        }
    }

    /// Whether a line marks the end of the transaction section
    pub(crate) fn is_section_trailer(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        match self {
            BankFormat::CommbankCreditCard => {
                lower.contains("interest charged")
                    || lower.contains("payment summary")
                    || lower.contains("closing balance")
            }
            BankFormat::CommbankSavings | BankFormat::WestpacSavings => {
                lower.contains("closing balance") || lower.contains("balance carried forward")
            }
            BankFormat::Generic => false,
        }
    }
}

fn parse_marked_amount(amount: &str, marker: Option<&str>) -> Option<bigdecimal::BigDecimal> {
    let value = parse_amount(amount)?;
    match marker {
        Some(m) if m.eq_ignore_ascii_case("dr") => Some(-value.abs()),
        _ => Some(value),
    }
}

/// Extract statement-level metadata for a detected format
///
/// Every field is optional; a statement missing all of them still
/// extracts, it just scores a low confidence.
pub fn extract_statement_info(text: &str, format: BankFormat) -> StatementInfo {
    let mut info = StatementInfo::default();

    for line in text.lines() {
        if info.account_number.is_none() {
            if let Some(caps) = ACCOUNT_NUMBER_RE.captures(line) {
                info.account_number = Some(caps[1].trim().to_string());
            } else if format == BankFormat::CommbankCreditCard {
                if let Some(caps) = CARD_NUMBER_RE.captures(line) {
                    info.account_number = Some(caps[1].trim().to_string());
                }
            }
        }

        if info.period_start.is_none() || info.period_end.is_none() {
            if let Some(caps) = PERIOD_RE.captures(line) {
                let start = parse_date(caps[1].trim());
                let end = parse_date(caps[2].trim());
                if start.is_some() && end.is_some() {
                    info.period_start = start;
                    info.period_end = end;
                }
            }
        }

        if info.opening_balance.is_none() {
            if let Some(caps) = OPENING_RE.captures(line) {
                info.opening_balance =
                    parse_marked_amount(&caps[1], caps.get(2).map(|m| m.as_str()));
            }
        }

        if info.closing_balance.is_none() {
            if let Some(caps) = CLOSING_RE.captures(line) {
                info.closing_balance =
                    parse_marked_amount(&caps[1], caps.get(2).map(|m| m.as_str()));
            }
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_detect_credit_card_before_savings() {
        // Savings phrases co-occur; credit-card indicators win
        let text = "Commonwealth Bank of Australia\nNetBank\nAwards Card Credit Card Statement";
        assert_eq!(BankFormat::detect(text), BankFormat::CommbankCreditCard);
    }

    #[test]
    fn test_detect_savings_and_westpac() {
        assert_eq!(
            BankFormat::detect("Commonwealth Bank of Australia Smart Access"),
            BankFormat::CommbankSavings
        );
        assert_eq!(
            BankFormat::detect("Westpac Banking Corporation statement"),
            BankFormat::WestpacSavings
        );
    }

    #[test]
    fn test_detect_generic_fallback() {
        assert_eq!(
            BankFormat::detect("Some Credit Union monthly statement"),
            BankFormat::Generic
        );
    }

    #[test]
    fn test_extract_info_savings() {
        let text = "\
Commonwealth Bank of Australia
Account Number: 06 2000 12345678
Statement Period: 01/01/2025 to 31/01/2025
Opening Balance: $1,200.00 CR
Closing Balance: $3,074.50 CR
";
        let info = extract_statement_info(text, BankFormat::CommbankSavings);
        assert_eq!(info.account_number.as_deref(), Some("06 2000 12345678"));
        assert_eq!(
            info.period_start,
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(
            info.period_end,
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(
            info.opening_balance,
            Some(BigDecimal::from_str("1200.00").unwrap())
        );
        assert_eq!(
            info.closing_balance,
            Some(BigDecimal::from_str("3074.50").unwrap())
        );
    }

    #[test]
    fn test_extract_info_overdrawn_dr_balance() {
        let text = "Opening Balance: $150.00 DR";
        let info = extract_statement_info(text, BankFormat::CommbankSavings);
        assert_eq!(
            info.opening_balance,
            Some(BigDecimal::from_str("-150.00").unwrap())
        );
    }

    #[test]
    fn test_extract_info_month_name_period() {
        let text = "Statement Period: 1 Jan 2025 - 31 Jan 2025";
        let info = extract_statement_info(text, BankFormat::Generic);
        assert_eq!(info.period_start, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(info.period_end, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn test_missing_fields_never_fail() {
        let info = extract_statement_info("nothing useful here", BankFormat::Generic);
        assert_eq!(info, StatementInfo::default());
    }
}
