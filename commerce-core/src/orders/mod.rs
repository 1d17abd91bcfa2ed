//! Order Fulfillment State Machine
//!
//! - [`machine`] - allowed status transitions
//! - [`storage`] - orders, order numbers, status history tables
//! - [`manager`] - placement, transitions, tracking, consistency checks

pub mod machine;
pub mod manager;
pub mod storage;

pub use machine::{can_transition, check_transition, next_statuses};
pub use manager::{FulfillmentManager, SYSTEM_ACTOR};
pub use storage::OrderStorage;
