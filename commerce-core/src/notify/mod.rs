//! Notification dispatch
//!
//! ```text
//! ledger / state machine ─ enqueue() ─→ mpsc ─→ NotificationWorker ─→ NotificationDispatcher
//!                                                  (bounded retry)
//! cart reminders ─ dispatch_now().await ─────────────────────────────→ NotificationDispatcher
//! ```
//!
//! Dispatch is best-effort: a failed or dropped notification is logged and
//! never undoes the mutation that produced it.

pub mod dispatcher;
pub mod service;
pub mod worker;

pub use dispatcher::{DispatchError, LoggingDispatcher, NotificationDispatcher, RecordingDispatcher};
pub use service::NotificationService;
pub use worker::NotificationWorker;
