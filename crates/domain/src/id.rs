//! Typed identifier newtypes backed by UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Service`](crate::service::Service).
    ServiceId
);

define_id!(
    /// Unique identifier for a [`StatusChange`](crate::service::StatusChange).
    StatusChangeId
);

define_id!(
    /// Unique identifier for an [`AvailablePart`](crate::part::AvailablePart).
    PartId
);

define_id!(
    /// Unique identifier for a [`PartAllocation`](crate::allocation::PartAllocation).
    AllocationId
);

define_id!(
    /// Unique identifier for a [`RemovedPart`](crate::removed_part::RemovedPart).
    RemovedPartId
);

define_id!(
    /// Unique identifier for an [`ActivityLogEntry`](crate::activity::ActivityLogEntry).
    ActivityId
);

define_id!(
    /// Unique identifier for a [`User`](crate::directory::User).
    ///
    /// Technicians are users with the technician role, so a service's
    /// `technician_id` is a `UserId` too.
    UserId
);

define_id!(
    /// Unique identifier for a [`Client`](crate::directory::Client).
    ClientId
);

define_id!(
    /// Unique identifier for an [`Appliance`](crate::directory::Appliance).
    ApplianceId
);

define_id!(
    /// Unique identifier for a request-tracking row.
    RequestId
);

define_id!(
    /// Unique identifier for a [`Notification`](crate::notification::Notification).
    NotificationId
);
