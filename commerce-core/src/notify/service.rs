//! Notification service - producer side of the dispatch queue

use super::dispatcher::{DispatchError, NotificationDispatcher};
use shared::models::NotificationPayload;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Hands notifications to the background worker
///
/// `enqueue` never blocks and never fails the caller: a full or closed
/// channel drops the notification with a warning.
#[derive(Clone)]
pub struct NotificationService {
    tx: mpsc::Sender<NotificationPayload>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("capacity", &self.tx.max_capacity())
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    /// Create the service; the receiver goes to a [`super::NotificationWorker`]
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NotificationPayload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, dispatcher }, rx)
    }

    /// Queue a notification for background delivery (non-blocking)
    ///
    /// Returns whether the notification was queued.
    pub fn enqueue(&self, payload: NotificationPayload) -> bool {
        let kind = payload.kind();
        match self.tx.try_send(payload) {
            Ok(()) => {
                tracing::debug!(kind = %kind, "Notification queued");
                true
            }
            Err(TrySendError::Full(payload)) => {
                tracing::warn!(
                    kind = %kind,
                    recipient = %payload.recipient(),
                    "Notification queue full, notification dropped"
                );
                false
            }
            Err(TrySendError::Closed(payload)) => {
                tracing::warn!(
                    kind = %kind,
                    recipient = %payload.recipient(),
                    "Notification worker stopped, notification dropped"
                );
                false
            }
        }
    }

    /// Send immediately, bypassing the queue (single attempt)
    pub async fn dispatch_now(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        self.dispatcher.send(payload.kind(), payload).await
    }

    pub fn dispatcher(&self) -> Arc<dyn NotificationDispatcher> {
        self.dispatcher.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingDispatcher;
    use rust_decimal::Decimal;
    use shared::models::NotificationKind;

    fn payload(code: &str) -> NotificationPayload {
        NotificationPayload::GiftCardDelivery {
            code: code.to_string(),
            amount: Decimal::new(500, 0),
            recipient_email: "meera@example.in".to_string(),
            purchaser_email: "asha@example.in".to_string(),
            message: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_enqueue_drops_when_full() {
        let (service, mut rx) = NotificationService::new(Arc::new(RecordingDispatcher::new()), 1);
        assert!(service.enqueue(payload("WZ-AAAA-AAAA")));
        assert!(!service.enqueue(payload("WZ-BBBB-BBBB")));
        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.kind(), NotificationKind::GiftCardDelivery);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_enqueue_after_worker_stopped() {
        let (service, rx) = NotificationService::new(Arc::new(RecordingDispatcher::new()), 4);
        drop(rx);
        assert!(!service.enqueue(payload("WZ-AAAA-AAAA")));
    }

    #[tokio::test]
    async fn test_dispatch_now_reports_failure() {
        let dispatcher = Arc::new(RecordingDispatcher::failing(1));
        let (service, _rx) = NotificationService::new(dispatcher.clone(), 4);
        assert!(service.dispatch_now(&payload("WZ-AAAA-AAAA")).await.is_err());
        assert!(service.dispatch_now(&payload("WZ-AAAA-AAAA")).await.is_ok());
        assert_eq!(dispatcher.attempts(), 2);
        assert_eq!(dispatcher.sent().len(), 1);
    }
}
