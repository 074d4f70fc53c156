//! Request tracking: rolling-window limits on customer submissions.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Kind of tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    ServiceRequest,
}

impl RequestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceRequest => "service_request",
        }
    }
}

/// At most `max_requests` per rolling `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestWindow {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RequestWindow {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            max_requests: 1,
        }
    }
}

impl RequestWindow {
    /// Start of the window ending at `now`.
    #[must_use]
    pub fn since(&self, now: Timestamp) -> Timestamp {
        now - self.window
    }

    #[must_use]
    pub fn window_hours(&self) -> i64 {
        self.window.num_hours()
    }
}
