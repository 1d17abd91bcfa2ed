//! Shared types for the commerce core
//!
//! Records, identifiers and the error-code taxonomy used by the ledger,
//! the fulfillment state machine and the cart reconciler, plus anything
//! that calls into them.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
