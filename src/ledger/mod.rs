//! Ledger functionality modules

pub mod transaction;

pub use transaction::*;
