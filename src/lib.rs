//! # Ledger Core
//!
//! A double-entry ledger core for personal and small-business bookkeeping,
//! centred on bank reconciliation: turning raw bank-statement text into
//! normalized transaction records, fuzzy-matching them against ledger
//! postings, and certifying that a bank-reported balance agrees with the
//! ledger.
//!
//! ## Features
//!
//! - **Double-entry invariants**: postings sum to zero within a cent, with
//!   GST split arithmetic validated on every business posting
//! - **Statement extraction**: bank-format detection, metadata recovery,
//!   and a line-scanning transaction extractor with advisory confidence
//! - **Reconciliation matching**: additive multi-signal scoring, match
//!   tiers, and greedy one-to-one assignment with no double-claiming
//! - **Reconciliation sessions**: an in-progress/locked lifecycle with
//!   balance certification and storage-enforced immutability after lock
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage injected at construction
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_core::statement::parse_statement;
//!
//! let parsed = parse_statement("05/01/2025 Coffee Shop 4.50 1195.50");
//! assert_eq!(parsed.transactions.len(), 1);
//! ```

pub mod ledger;
pub mod reconciliation;
pub mod statement;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciliation::*;
pub use statement::{parse_statement, BankFormat, ExtractionConfidence, ParsedStatement};
pub use tax::gst::*;
pub use traits::*;
pub use types::*;

// Re-export transaction patterns for convenience
pub use ledger::transaction::patterns;
pub use ledger::{TransactionBuilder, TransactionManager};
