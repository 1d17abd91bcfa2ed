//! Abandoned Cart Reconciler
//!
//! At most one active cart per email, reconciled against completed orders.

pub mod reconciler;
pub mod storage;

pub use reconciler::CartReconciler;
pub use storage::CartStorage;
