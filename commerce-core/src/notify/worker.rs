//! 通知后台 Worker
//!
//! 从 mpsc 通道消费通知，调用 dispatcher，失败时有限次重试（指数退避）。
//! 通道关闭时自动退出。

use super::dispatcher::NotificationDispatcher;
use shared::models::NotificationPayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct NotificationWorker {
    dispatcher: Arc<dyn NotificationDispatcher>,
    max_retries: u32,
    retry_base: Duration,
}

impl NotificationWorker {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        max_retries: u32,
        retry_base: Duration,
    ) -> Self {
        Self {
            dispatcher,
            max_retries,
            retry_base,
        }
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: mpsc::Receiver<NotificationPayload>) {
        tracing::info!("Notification worker started");

        while let Some(payload) = rx.recv().await {
            self.deliver(&payload).await;
        }

        tracing::info!("Notification channel closed, worker stopping");
    }

    /// Deliver one notification with bounded retry; returns whether it was sent
    pub async fn deliver(&self, payload: &NotificationPayload) -> bool {
        let kind = payload.kind();
        let mut attempt: u32 = 0;
        loop {
            match self.dispatcher.send(kind, payload).await {
                Ok(()) => {
                    tracing::debug!(kind = %kind, attempt, "Notification delivered");
                    return true;
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_base.saturating_mul(1 << attempt.min(10));
                    tracing::warn!(
                        kind = %kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Notification dispatch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        kind = %kind,
                        recipient = %payload.recipient(),
                        attempts = attempt + 1,
                        error = %e,
                        "Notification dispatch failed, giving up"
                    );
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DispatchError, NotificationService, RecordingDispatcher};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::models::NotificationKind;

    fn reminder() -> NotificationPayload {
        NotificationPayload::CartReminder {
            cart_id: 1,
            user_email: "asha@example.in".to_string(),
            items: vec![],
            total_amount: Decimal::new(1200, 0),
            reminder_number: 1,
        }
    }

    struct RejectingDispatcher;

    #[async_trait]
    impl NotificationDispatcher for RejectingDispatcher {
        async fn send(
            &self,
            _kind: NotificationKind,
            _payload: &NotificationPayload,
        ) -> Result<(), DispatchError> {
            Err(DispatchError::Rejected("bad address".to_string()))
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let dispatcher = Arc::new(RecordingDispatcher::failing(2));
        let worker = NotificationWorker::new(dispatcher.clone(), 3, Duration::from_millis(1));
        assert!(worker.deliver(&reminder()).await);
        assert_eq!(dispatcher.attempts(), 3);
        assert_eq!(dispatcher.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let dispatcher = Arc::new(RecordingDispatcher::failing(10));
        let worker = NotificationWorker::new(dispatcher.clone(), 2, Duration::from_millis(1));
        assert!(!worker.deliver(&reminder()).await);
        assert_eq!(dispatcher.attempts(), 3);
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_is_not_retried() {
        let worker =
            NotificationWorker::new(Arc::new(RejectingDispatcher), 5, Duration::from_millis(1));
        assert!(!worker.deliver(&reminder()).await);
    }

    #[tokio::test]
    async fn test_run_drains_queue_and_stops() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let (service, rx) = NotificationService::new(dispatcher.clone(), 8);
        let worker = NotificationWorker::new(dispatcher.clone(), 0, Duration::from_millis(1));
        assert!(service.enqueue(reminder()));
        assert!(service.enqueue(reminder()));
        drop(service);
        worker.run(rx).await;
        assert_eq!(dispatcher.sent().len(), 2);
    }
}
