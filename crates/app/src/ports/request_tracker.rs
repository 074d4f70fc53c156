//! Request tracker port: rolling-window rate limiting.

use std::future::Future;
use std::sync::Arc;

use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::UserId;
use repairdesk_domain::request::RequestKind;
use repairdesk_domain::time::Timestamp;

pub trait RequestTracker {
    /// Number of tracked requests of `kind` by `user` at or after `since`.
    fn count_requests_since(
        &self,
        user: UserId,
        kind: RequestKind,
        since: Timestamp,
    ) -> impl Future<Output = Result<u32, RepairDeskError>> + Send;

    /// Record a request at `at` only if fewer than `limit` were recorded at or
    /// after `since`. The count and the insert are one atomic step.
    ///
    /// Returns `false` (and records nothing) when the window is full.
    fn admit(
        &self,
        user: UserId,
        kind: RequestKind,
        at: Timestamp,
        since: Timestamp,
        limit: u32,
    ) -> impl Future<Output = Result<bool, RepairDeskError>> + Send;
}

impl<T: RequestTracker + Send + Sync> RequestTracker for Arc<T> {
    fn count_requests_since(
        &self,
        user: UserId,
        kind: RequestKind,
        since: Timestamp,
    ) -> impl Future<Output = Result<u32, RepairDeskError>> + Send {
        (**self).count_requests_since(user, kind, since)
    }

    fn admit(
        &self,
        user: UserId,
        kind: RequestKind,
        at: Timestamp,
        since: Timestamp,
        limit: u32,
    ) -> impl Future<Output = Result<bool, RepairDeskError>> + Send {
        (**self).admit(user, kind, at, since, limit)
    }
}
