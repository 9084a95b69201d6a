//! Bank reconciliation: fuzzy statement matching and session lifecycle

pub mod matching;
pub mod session;

pub use matching::*;
pub use session::*;
