//! Dispatcher contract and built-in implementations

use async_trait::async_trait;
use shared::models::{NotificationKind, NotificationPayload};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Downstream refused the notification; retrying will not help
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// Downstream temporarily unavailable
    #[error("Dispatcher unavailable: {0}")]
    Unavailable(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Unavailable(_))
    }
}

/// External notification sink (email / push)
///
/// Accepts a fully-formed payload. Template rendering happens downstream.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError>;
}

/// Writes every notification to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn send(
        &self,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;
        tracing::info!(
            kind = %kind,
            recipient = %payload.recipient(),
            payload = %body,
            "Notification dispatched"
        );
        Ok(())
    }
}

/// In-memory dispatcher for tests and dry runs
///
/// Keeps every notification in memory and never contacts a recipient; can
/// be told to fail the next N sends. Not meant for production wiring, use
/// [`LoggingDispatcher`] or a real transport there.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationPayload>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` sends with `Unavailable`
    pub fn failing(n: u32) -> Self {
        let dispatcher = Self::default();
        dispatcher.failures_left.store(n, Ordering::SeqCst);
        dispatcher
    }

    pub fn sent(&self) -> Vec<NotificationPayload> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sends attempted, including failed ones
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        _kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DispatchError::Unavailable("simulated outage".to_string()));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(payload.clone()),
            Err(poisoned) => poisoned.into_inner().push(payload.clone()),
        }
        Ok(())
    }
}
