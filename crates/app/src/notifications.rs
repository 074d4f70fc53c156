//! In-process notification delivery backed by a bounded tokio [`mpsc`] queue.
//!
//! [`QueueDispatcher`] never waits: a full or closed queue is reported to the
//! caller, who logs it and moves on. [`NotificationWorker`] drains the queue in
//! a background task and hands each notification to a
//! [`NotificationTransport`].

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use repairdesk_domain::notification::Notification;

use crate::ports::{NotificationDispatcher, NotificationError, NotificationTransport};

/// Producer side of the notification queue.
#[derive(Clone)]
pub struct QueueDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl QueueDispatcher {
    /// Create a dispatcher and the receiver a [`NotificationWorker`] drains.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for QueueDispatcher {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send {
        let result = self.sender.try_send(notification).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => NotificationError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotificationError::Closed,
        });
        async { result }
    }
}

/// Hand `notification` to `dispatcher`, logging instead of failing.
pub(crate) async fn dispatch_best_effort<N: NotificationDispatcher>(
    dispatcher: &N,
    notification: Notification,
) {
    let id = notification.id;
    let kind = notification.kind;
    if let Err(err) = dispatcher.notify(notification).await {
        tracing::warn!(notification_id = %id, %kind, error = %err, "notification dropped");
    }
}

/// Background task delivering queued notifications.
pub struct NotificationWorker;

impl NotificationWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker runs until [`NotificationWorkerHandle::stop`] is called or
    /// every [`QueueDispatcher`] clone is dropped.
    pub fn start<T>(
        mut receiver: mpsc::Receiver<Notification>,
        transport: T,
    ) -> NotificationWorkerHandle
    where
        T: NotificationTransport + Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    next = receiver.recv() => match next {
                        Some(notification) => deliver(&transport, &notification).await,
                        None => break,
                    },
                }
            }
            tracing::debug!("notification worker stopped");
        });
        NotificationWorkerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

async fn deliver<T: NotificationTransport>(transport: &T, notification: &Notification) {
    match transport.deliver(notification).await {
        Ok(()) => tracing::debug!(notification_id = %notification.id, "notification delivered"),
        Err(err) => tracing::warn!(
            notification_id = %notification.id,
            kind = %notification.kind,
            error = %err,
            "notification delivery failed"
        ),
    }
}

/// Owner of a running [`NotificationWorker`].
pub struct NotificationWorkerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl NotificationWorkerHandle {
    /// Signal the worker to stop and wait for it to finish.
    ///
    /// Notifications still queued are not delivered.
    pub async fn stop(self) {
        // The worker may already have exited on a closed queue.
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "notification worker panicked");
        }
    }
}

/// Transport that writes every notification to the tracing log.
///
/// Stands in for SMS and email providers, which live outside this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTransport;

impl NotificationTransport for TracingTransport {
    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send {
        tracing::info!(
            notification_id = %notification.id,
            kind = %notification.kind,
            service_id = ?notification.service_id,
            payload = %notification.payload,
            "notification"
        );
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairdesk_domain::id::ServiceId;
    use repairdesk_domain::notification::NotificationKind;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<Notification>>,
        fail_first: Mutex<bool>,
    }

    impl NotificationTransport for RecordingTransport {
        fn deliver(
            &self,
            notification: &Notification,
        ) -> impl Future<Output = Result<(), NotificationError>> + Send {
            let mut fail = self.fail_first.lock().unwrap();
            let result = if *fail {
                *fail = false;
                Err(NotificationError::Delivery("smtp down".to_string()))
            } else {
                self.delivered.lock().unwrap().push(notification.clone());
                Ok(())
            };
            async { result }
        }
    }

    fn notification(kind: NotificationKind) -> Notification {
        Notification::new(kind, Some(ServiceId::new()), serde_json::json!({}))
    }

    async fn wait_for(transport: &RecordingTransport, count: usize) {
        for _ in 0..100 {
            if transport.delivered.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("expected {count} deliveries");
    }

    #[tokio::test]
    async fn should_report_full_queue_without_blocking() {
        let (dispatcher, _rx) = QueueDispatcher::new(1);
        dispatcher
            .notify(notification(NotificationKind::ServiceAssigned))
            .await
            .unwrap();
        let second = dispatcher
            .notify(notification(NotificationKind::ServiceAssigned))
            .await;
        assert_eq!(second, Err(NotificationError::QueueFull));
    }

    #[tokio::test]
    async fn should_report_closed_queue() {
        let (dispatcher, rx) = QueueDispatcher::new(4);
        drop(rx);
        let result = dispatcher
            .notify(notification(NotificationKind::PartsAllocated))
            .await;
        assert_eq!(result, Err(NotificationError::Closed));
    }

    #[tokio::test]
    async fn should_deliver_queued_notifications_to_transport() {
        let (dispatcher, rx) = QueueDispatcher::new(8);
        let transport = Arc::new(RecordingTransport::default());
        let handle = NotificationWorker::start(rx, Arc::clone(&transport));

        let sent = notification(NotificationKind::ServiceCompleted);
        let sent_id = sent.id;
        dispatcher.notify(sent).await.unwrap();

        wait_for(&transport, 1).await;
        handle.stop().await;

        let delivered = transport.delivered.lock().unwrap();
        assert_eq!(delivered[0].id, sent_id);
    }

    #[tokio::test]
    async fn should_keep_running_after_transport_failure() {
        let (dispatcher, rx) = QueueDispatcher::new(8);
        let transport = Arc::new(RecordingTransport {
            fail_first: Mutex::new(true),
            ..RecordingTransport::default()
        });
        let handle = NotificationWorker::start(rx, Arc::clone(&transport));

        dispatcher
            .notify(notification(NotificationKind::ClientNotAvailable))
            .await
            .unwrap();
        dispatcher
            .notify(notification(NotificationKind::PartsRemoved))
            .await
            .unwrap();

        wait_for(&transport, 1).await;
        handle.stop().await;

        let delivered = transport.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, NotificationKind::PartsRemoved);
    }

    #[tokio::test]
    async fn should_stop_worker_when_requested() {
        let (_dispatcher, rx) = QueueDispatcher::new(8);
        let handle = NotificationWorker::start(rx, TracingTransport);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.stop())
            .await
            .unwrap();
    }
}
