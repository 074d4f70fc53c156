//! Notification: an immutable record of something a person should hear about.
//!
//! Notifications are produced by lifecycle transitions and stock movements.
//! Delivering them (SMS, email) happens outside the core.

use serde::{Deserialize, Serialize};

use crate::id::{NotificationId, ServiceId};
use crate::time::Timestamp;

/// Discriminator for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ServiceAssigned,
    ServiceCompleted,
    PartsAllocated,
    PartsRemoved,
    ClientNotAvailable,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceAssigned => "service_assigned",
            Self::ServiceCompleted => "service_completed",
            Self::PartsAllocated => "parts_allocated",
            Self::PartsRemoved => "parts_removed",
            Self::ClientNotAvailable => "client_not_available",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub service_id: Option<ServiceId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

impl Notification {
    /// Create a notification stamped with the current time.
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        service_id: Option<ServiceId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            service_id,
            payload,
            created_at: crate::time::now(),
        }
    }
}
