//! Fulfillment status transitions
//!
//! ```text
//! pending ──→ preparing ──→ shipped ──→ delivered
//!    │            │            │
//!    └────────────┴────────────┴──→ cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal. Re-entering the current status
//! is not a transition.

use crate::utils::{CommerceError, CommerceResult};
use shared::models::OrderStatus;

/// Whether `from → to` is an edge of the fulfillment graph
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Preparing)
            | (Preparing, Shipped)
            | (Shipped, Delivered)
            | (Pending | Preparing | Shipped, Cancelled)
    )
}

pub fn check_transition(from: OrderStatus, to: OrderStatus) -> CommerceResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CommerceError::InvalidTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
pub fn next_statuses(from: OrderStatus) -> Vec<OrderStatus> {
    use OrderStatus::*;
    [Pending, Preparing, Shipped, Delivered, Cancelled]
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}
