//! Notification ports: handing notifications off and delivering them.
//!
//! [`NotificationDispatcher`] is what the use-cases call. It must return
//! quickly; failures are logged by the caller and never undo the operation
//! that produced the notification. [`NotificationTransport`] is the outbound
//! SMS/email boundary driven by the background worker.

use std::future::Future;
use std::sync::Arc;

use repairdesk_domain::notification::Notification;

/// Why a notification could not be handed off or delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification queue is closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Accepts notifications from the core, best-effort.
pub trait NotificationDispatcher {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Delivers a single notification to its recipients.
pub trait NotificationTransport {
    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

impl<T: NotificationDispatcher + Send + Sync> NotificationDispatcher for Arc<T> {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send {
        (**self).notify(notification)
    }
}

impl<T: NotificationTransport + Send + Sync> NotificationTransport for Arc<T> {
    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send {
        (**self).deliver(notification)
    }
}
