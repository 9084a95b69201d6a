//! Date and amount lexing plus per-format transaction extraction
//!
//! Extraction is a line-scanning state machine: a header marker enters the
//! transaction section, a trailer marker exits it, lines with no leading
//! date are folded into the previous dated line, and each anchor line has
//! its trailing balance token stripped before the remaining trailing
//! amount token is classified debit or credit using the format's sign
//! convention. Unrecognized lines are skipped; extraction never fails.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

use crate::statement::format::BankFormat;
use crate::types::StatementTransaction;

/// Description substrings that mark a single-amount line as a debit
const DEBIT_KEYWORDS: &[&str] = &[
    "withdrawal",
    "payment",
    "purchase",
    "fee",
    "charge",
    "debit",
    "transfer to",
    "eftpos",
    "atm",
];

/// Description substrings that mark a single-amount line as a credit
const CREDIT_KEYWORDS: &[&str] = &[
    "deposit",
    "credit",
    "interest",
    "refund",
    "salary",
    "transfer from",
];

static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})$").expect("valid regex"));

static MONTH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s+([A-Za-z]{3,})\s+(\d{2,4})$").expect("valid regex"));

static AMOUNT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\$?\d[\d,]*(?:\.\d{1,2})?(?:-|cr|dr)?$").expect("valid regex")
});

/// Resolve a 2-digit year against the pivot: <50 is 20xx, >=50 is 19xx
fn pivot_year(year: i32) -> i32 {
    if year < 100 {
        if year < 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a statement date
///
/// Accepts `DD/MM/YYYY`, `DD-MM-YYYY`, their 2-digit-year forms
/// (pivot: <50 resolves to 20xx, >=50 to 19xx), and `D MMM YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(caps) = NUMERIC_DATE_RE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = pivot_year(caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = MONTH_DATE_RE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = pivot_year(caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Whether a token looks like a money amount, allowing a leading `$` and a
/// trailing `-`/`CR`/`DR` marker
pub fn is_amount_token(token: &str) -> bool {
    AMOUNT_TOKEN_RE.is_match(token)
}

/// Parse a money token into a signed amount
///
/// Strips `$` and thousands separators; a trailing `-` or `DR` marker
/// negates, a trailing `CR` marker is positive.
pub fn parse_amount(s: &str) -> Option<BigDecimal> {
    let mut s = s.trim();
    let mut negative = false;

    if let Some(rest) = s.strip_suffix('-') {
        negative = true;
        s = rest.trim_end();
    } else if s.len() >= 2 {
        let (head, tail) = s.split_at(s.len() - 2);
        if tail.eq_ignore_ascii_case("dr") {
            negative = true;
            s = head.trim_end();
        } else if tail.eq_ignore_ascii_case("cr") {
            s = head.trim_end();
        }
    }

    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    }
    let s = s.strip_prefix('$').unwrap_or(s);

    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = BigDecimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}

/// Keyword heuristic for single-amount lines: debit unless the description
/// carries a credit cue
pub fn is_debit_description(description: &str) -> bool {
    let lower = description.to_lowercase();
    if DEBIT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return true;
    }
    !CREDIT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Split a line into its leading date and the remaining tokens
fn split_anchor(line: &str) -> Option<(NaiveDate, Vec<&str>)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    if let Some(date) = parse_date(tokens[0]) {
        return Some((date, tokens[1..].to_vec()));
    }

    if tokens.len() >= 3 {
        let joined = format!("{} {} {}", tokens[0], tokens[1], tokens[2]);
        if let Some(date) = parse_date(&joined) {
            return Some((date, tokens[3..].to_vec()));
        }
    }

    None
}

/// Strip a trailing balance token: `X.XX CR`/`X.XX DR`, a joined
/// `X.XXCR`/`X.XXDR`, or a bare number preceded by another amount token
fn take_balance(tokens: &mut Vec<&str>) -> Option<BigDecimal> {
    if tokens.len() >= 2 {
        let last = tokens[tokens.len() - 1];
        let prev = tokens[tokens.len() - 2];
        if (last.eq_ignore_ascii_case("cr") || last.eq_ignore_ascii_case("dr"))
            && is_amount_token(prev)
        {
            let marker = last;
            let value = parse_amount(prev)?;
            tokens.truncate(tokens.len() - 2);
            return Some(if marker.eq_ignore_ascii_case("dr") {
                -value
            } else {
                value
            });
        }
    }

    if tokens.len() >= 2 {
        let last = tokens[tokens.len() - 1];
        let prev = tokens[tokens.len() - 2];
        let joined_marker = {
            let upper = last.to_uppercase();
            upper.ends_with("CR") || upper.ends_with("DR")
        };
        if is_amount_token(last) && (joined_marker || !last.starts_with('$')) && is_amount_token(prev)
        {
            let value = parse_amount(last)?;
            tokens.truncate(tokens.len() - 1);
            return Some(value);
        }
    }

    None
}

/// Classify the trailing amount token using the format's sign convention
fn classify_amount(format: BankFormat, token: &str) -> Option<(bool, BigDecimal)> {
    if !is_amount_token(token) {
        return None;
    }
    let magnitude = parse_amount(token)?.abs();

    let is_credit = match format {
        // Credit card: a trailing '-' marks a payment received
        BankFormat::CommbankCreditCard => token.ends_with('-'),
        // Savings: deposits are printed with a '$', withdrawals bare
        BankFormat::CommbankSavings => token.starts_with('$'),
        // Westpac: credits carry a CR suffix
        BankFormat::WestpacSavings => token.to_uppercase().ends_with("CR"),
        BankFormat::Generic => false,
    };

    Some((is_credit, magnitude))
}

/// Extract ordered statement transactions from raw text
pub fn extract_transactions(text: &str, format: BankFormat) -> Vec<StatementTransaction> {
    match format {
        BankFormat::Generic => extract_generic(text),
        _ => extract_sectioned(text, format),
    }
}

fn extract_sectioned(text: &str, format: BankFormat) -> Vec<StatementTransaction> {
    let mut transactions: Vec<StatementTransaction> = Vec::new();
    let mut in_section = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if !in_section {
            if format.is_section_header(line) {
                in_section = true;
            }
            continue;
        }

        if format.is_section_trailer(line) {
            in_section = false;
            continue;
        }

        let Some((date, mut tokens)) = split_anchor(line) else {
            // Continuation line: fold into the previous dated line
            if let Some(last) = transactions.last_mut() {
                last.description.push(' ');
                last.description.push_str(line);
                last.raw_text.push('\n');
                last.raw_text.push_str(line);
            } else {
                debug!(%line, "skipping line before first anchor");
            }
            continue;
        };

        let balance = take_balance(&mut tokens);

        let Some(amount_token) = tokens.last().copied() else {
            debug!(%line, "skipping anchor line with no amount");
            continue;
        };
        let Some((is_credit, magnitude)) = classify_amount(format, amount_token) else {
            debug!(%line, "skipping anchor line with unparseable amount");
            continue;
        };
        tokens.truncate(tokens.len() - 1);

        let description = tokens.join(" ");
        let (debit, credit) = if is_credit {
            (None, Some(magnitude))
        } else {
            (Some(magnitude), None)
        };

        transactions.push(StatementTransaction {
            date,
            description,
            debit,
            credit,
            balance,
            raw_text: line.to_string(),
        });
    }

    transactions
}

/// Generic fallback: no section markers, 1-3 trailing numeric tokens per
/// line (amount / amount,balance / debit,credit,balance), keyword
/// classification for single-amount lines
fn extract_generic(text: &str) -> Vec<StatementTransaction> {
    let mut transactions = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((date, tokens)) = split_anchor(line) else {
            debug!(%line, "skipping undated line");
            continue;
        };

        let mut split = tokens.len();
        while split > 0 && tokens.len() - split < 3 && is_amount_token(tokens[split - 1]) {
            split -= 1;
        }
        let amounts: Vec<BigDecimal> = match tokens[split..]
            .iter()
            .map(|t| parse_amount(t).map(|a| a.abs()))
            .collect()
        {
            Some(amounts) => amounts,
            None => {
                debug!(%line, "skipping line with unparseable amount");
                continue;
            }
        };
        if amounts.is_empty() {
            debug!(%line, "skipping line with no trailing amount");
            continue;
        }

        let description = tokens[..split].join(" ");
        let (debit, credit, balance) = match amounts.as_slice() {
            [amount] => {
                if is_debit_description(&description) {
                    (Some(amount.clone()), None, None)
                } else {
                    (None, Some(amount.clone()), None)
                }
            }
            [amount, balance] => {
                if is_debit_description(&description) {
                    (Some(amount.clone()), None, Some(balance.clone()))
                } else {
                    (None, Some(amount.clone()), Some(balance.clone()))
                }
            }
            [debit, credit, balance] => (
                Some(debit.clone()),
                Some(credit.clone()),
                Some(balance.clone()),
            ),
            _ => unreachable!("at most three trailing tokens are collected"),
        };

        transactions.push(StatementTransaction {
            date,
            description,
            debit,
            credit,
            balance,
            raw_text: line.to_string(),
        });
    }

    transactions
}

/// Whether consecutive balance-carrying lines agree with the line amounts
/// within a cent
///
/// Advisory check for callers that want to sanity-check an extraction
/// before matching; a statement with fewer than two balances is trivially
/// consistent.
pub fn balances_are_consistent(transactions: &[StatementTransaction]) -> bool {
    let tolerance = crate::types::cent_tolerance();
    let mut previous: Option<&BigDecimal> = None;

    for tx in transactions {
        if let Some(balance) = &tx.balance {
            if let Some(prev) = previous {
                let movement = tx.signed_amount();
                if ((balance - prev) - movement).abs() > tolerance {
                    return false;
                }
            }
            previous = Some(balance);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("05/01/2025"), Some(date(2025, 1, 5)));
        assert_eq!(parse_date("05-01-2025"), Some(date(2025, 1, 5)));
        assert_eq!(parse_date("5 Jan 2025"), Some(date(2025, 1, 5)));
        assert_eq!(parse_date("31 December 2024"), Some(date(2024, 12, 31)));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_parse_date_pivot_year() {
        assert_eq!(parse_date("05/01/25"), parse_date("05/01/2025"));
        assert_eq!(parse_date("05/01/49"), Some(date(2049, 1, 5)));
        assert_eq!(parse_date("05/01/50"), Some(date(1950, 1, 5)));
        assert_eq!(parse_date("05/01/99"), Some(date(1999, 1, 5)));
    }

    #[test]
    fn test_parse_amount_markers() {
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("250.00-"), Some(dec("-250.00")));
        assert_eq!(parse_amount("123.45CR"), Some(dec("123.45")));
        assert_eq!(parse_amount("123.45DR"), Some(dec("-123.45")));
        assert_eq!(parse_amount("garbage"), None);
    }

    #[test]
    fn test_debit_keyword_heuristic() {
        assert!(is_debit_description("EFTPOS Woolworths"));
        assert!(is_debit_description("Monthly account fee"));
        assert!(is_debit_description("Coffee Shop"));
        assert!(!is_debit_description("Salary ACME PTY LTD"));
        assert!(!is_debit_description("Interest earned"));
        assert!(is_debit_description("Direct Debit Insurance"));
    }

    #[test]
    fn test_generic_amount_and_balance_line() {
        let txs = extract_transactions("05/01/2025 Coffee Shop 4.50 1195.50", BankFormat::Generic);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].date, date(2025, 1, 5));
        assert_eq!(txs[0].description, "Coffee Shop");
        assert_eq!(txs[0].debit, Some(dec("4.50")));
        assert_eq!(txs[0].credit, None);
        assert_eq!(txs[0].balance, Some(dec("1195.50")));
    }

    #[test]
    fn test_generic_single_amount_credit_line() {
        let txs = extract_transactions("06/01/2025 Salary ACME 2500.00", BankFormat::Generic);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].credit, Some(dec("2500.00")));
        assert_eq!(txs[0].debit, None);
    }

    #[test]
    fn test_generic_three_token_line() {
        let txs = extract_transactions("07/01/2025 Adjustment 10.00 15.00 1200.50", BankFormat::Generic);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].debit, Some(dec("10.00")));
        assert_eq!(txs[0].credit, Some(dec("15.00")));
        assert_eq!(txs[0].balance, Some(dec("1200.50")));
    }

    #[test]
    fn test_generic_skips_undated_and_unparseable_lines() {
        let text = "Statement of account\n05/01/2025 Coffee Shop 4.50\nThank you for banking with us";
        let txs = extract_transactions(text, BankFormat::Generic);
        assert_eq!(txs.len(), 1);
    }

    #[test]
    fn test_sectioned_savings_extraction() {
        let text = "\
Commonwealth Bank of Australia
Statement Period: 01/01/2025 to 31/01/2025

Date Transaction Debit Credit Balance
01/01/2025 EFTPOS WOOLWORTHS 2137 125.50 1,074.50 CR
03/01/2025 Salary ACME PTY LTD $2,500.00 3,574.50 CR
05/01/2025 Transfer to savings 500.00 3,074.50 CR
ref 884123
CLOSING BALANCE 3,074.50 CR
";
        let txs = extract_transactions(text, BankFormat::CommbankSavings);
        assert_eq!(txs.len(), 3);

        assert_eq!(txs[0].description, "EFTPOS WOOLWORTHS 2137");
        assert_eq!(txs[0].debit, Some(dec("125.50")));
        assert_eq!(txs[0].balance, Some(dec("1074.50")));

        assert_eq!(txs[1].credit, Some(dec("2500.00")));
        assert_eq!(txs[1].debit, None);

        // Continuation line folded into the prior anchor
        assert_eq!(txs[2].description, "Transfer to savings ref 884123");
        assert_eq!(txs[2].debit, Some(dec("500.00")));
    }

    #[test]
    fn test_sectioned_credit_card_trailing_minus() {
        let text = "\
CommBank Awards Credit Card Statement

Date Transaction Amount Balance
05/01/2025 Payment Received 250.00- 835.00
07/01/2025 COLES 0423 SYDNEY 85.00 920.00
Interest charged on purchases
";
        let txs = extract_transactions(text, BankFormat::CommbankCreditCard);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].credit, Some(dec("250.00")));
        assert_eq!(txs[0].debit, None);
        assert_eq!(txs[1].debit, Some(dec("85.00")));
    }

    #[test]
    fn test_sectioned_westpac_cr_suffix() {
        let text = "\
Westpac Banking Corporation

Date Description Amount Balance
02/01/2025 Deposit branch 500.00CR 1,500.00
04/01/2025 Card purchase 42.00 1,458.00
CLOSING BALANCE
";
        let txs = extract_transactions(text, BankFormat::WestpacSavings);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].credit, Some(dec("500.00")));
        assert_eq!(txs[1].debit, Some(dec("42.00")));
    }

    #[test]
    fn test_zero_transactions_is_valid() {
        let txs = extract_transactions("no transactions here", BankFormat::Generic);
        assert!(txs.is_empty());
    }

    #[test]
    fn test_balance_consistency() {
        let consistent = extract_transactions(
            "05/01/2025 Coffee Shop 4.50 1195.50\n06/01/2025 Lunch purchase 15.50 1180.00",
            BankFormat::Generic,
        );
        assert!(balances_are_consistent(&consistent));

        let inconsistent = extract_transactions(
            "05/01/2025 Coffee Shop 4.50 1195.50\n06/01/2025 Lunch purchase 15.50 900.00",
            BankFormat::Generic,
        );
        assert!(!balances_are_consistent(&inconsistent));
    }
}
