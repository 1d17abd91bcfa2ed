//! Data models
//!
//! Closed, versioned records persisted by the commerce core.
//! All IDs are `u64` allocated from per-entity counters in the store;
//! all timestamps are Unix milliseconds.

pub mod cart;
pub mod gift_card;
pub mod notification;
pub mod order;

// Re-exports
pub use cart::*;
pub use gift_card::*;
pub use notification::*;
pub use order::*;

/// Current version of every persisted record layout
pub const SCHEMA_VERSION: u16 = 1;

pub(crate) fn default_schema_version() -> u16 {
    SCHEMA_VERSION
}
