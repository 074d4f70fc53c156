//! `SQLite` implementation of [`RequestTracker`].

use sqlx::SqlitePool;

use repairdesk_app::ports::RequestTracker;
use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::UserId;
use repairdesk_domain::request::RequestKind;
use repairdesk_domain::time::Timestamp;

use crate::columns::stored;
use crate::error::StorageError;

const COUNT_SINCE: &str = r"
    SELECT COUNT(*) FROM service_requests
    WHERE user_id = ? AND kind = ? AND requested_at >= ?
";

// Count and insert in one statement so two submissions cannot both pass.
const ADMIT: &str = r"
    INSERT INTO service_requests (user_id, kind, requested_at)
    SELECT ?1, ?2, ?3
    WHERE (
        SELECT COUNT(*) FROM service_requests
        WHERE user_id = ?1 AND kind = ?2 AND requested_at >= ?4
    ) < ?5
";

/// `SQLite`-backed request tracker.
pub struct SqliteRequestTracker {
    pool: SqlitePool,
}

impl SqliteRequestTracker {
    /// Create a new tracker using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RequestTracker for SqliteRequestTracker {
    async fn count_requests_since(
        &self,
        user: UserId,
        kind: RequestKind,
        since: Timestamp,
    ) -> Result<u32, RepairDeskError> {
        let (count,): (i64,) = sqlx::query_as(COUNT_SINCE)
            .bind(user.as_uuid())
            .bind(kind.as_str())
            .bind(stored(since))
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn admit(
        &self,
        user: UserId,
        kind: RequestKind,
        at: Timestamp,
        since: Timestamp,
        limit: u32,
    ) -> Result<bool, RepairDeskError> {
        let result = sqlx::query(ADMIT)
            .bind(user.as_uuid())
            .bind(kind.as_str())
            .bind(stored(at))
            .bind(stored(since))
            .bind(i64::from(limit))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::pool::{file_database, memory_database};
    use chrono::Duration;
    use repairdesk_domain::time::now;

    #[tokio::test]
    async fn should_admit_up_to_limit_within_window() {
        let tracker = SqliteRequestTracker::new(memory_database().await.pool().clone());
        let user = UserId::new();
        let at = now();
        let since = at - Duration::hours(24);

        assert!(tracker.admit(user, RequestKind::ServiceRequest, at, since, 2).await.unwrap());
        assert!(tracker.admit(user, RequestKind::ServiceRequest, at, since, 2).await.unwrap());
        assert!(!tracker.admit(user, RequestKind::ServiceRequest, at, since, 2).await.unwrap());

        let count = tracker
            .count_requests_since(user, RequestKind::ServiceRequest, since)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn should_ignore_requests_outside_window_and_other_users() {
        let tracker = SqliteRequestTracker::new(memory_database().await.pool().clone());
        let user = UserId::new();
        let at = now();
        let old = at - Duration::hours(30);

        tracker
            .admit(user, RequestKind::ServiceRequest, old, old - Duration::hours(24), 1)
            .await
            .unwrap();
        tracker
            .admit(UserId::new(), RequestKind::ServiceRequest, at, at - Duration::hours(24), 1)
            .await
            .unwrap();

        let admitted = tracker
            .admit(user, RequestKind::ServiceRequest, at, at - Duration::hours(24), 1)
            .await
            .unwrap();
        assert!(admitted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_admit_one_of_many_simultaneous_requests() {
        let (db, _dir) = file_database(5).await;
        let tracker = Arc::new(SqliteRequestTracker::new(db.pool().clone()));
        let user = UserId::new();
        let at = now();
        let since = at - Duration::hours(24);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let tracker = Arc::clone(&tracker);
            tasks.spawn(async move {
                tracker
                    .admit(user, RequestKind::ServiceRequest, at, since, 1)
                    .await
            });
        }

        let mut admitted = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap().unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        let count = tracker
            .count_requests_since(user, RequestKind::ServiceRequest, since)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
