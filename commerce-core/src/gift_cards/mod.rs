//! Gift Card Ledger
//!
//! Balance lifecycle of gift cards backed by an append-only transaction log.

pub mod ledger;
pub mod storage;

pub use ledger::{GiftCardLedger, LedgerSettings};
pub use storage::GiftCardStorage;
