//! `SQLite` implementation of [`RemovedPartRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use repairdesk_app::ports::RemovedPartRepository;
use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::{RemovedPartId, ServiceId, UserId};
use repairdesk_domain::removed_part::RemovedPart;

use crate::columns::{optional_timestamp, stored, stored_optional, timestamp};
use crate::error::StorageError;

struct Wrapper(RemovedPart);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(RemovedPart {
            id: RemovedPartId::from_uuid(row.try_get("id")?),
            service_id: ServiceId::from_uuid(row.try_get("service_id")?),
            technician_id: UserId::from_uuid(row.try_get("technician_id")?),
            part_name: row.try_get("part_name")?,
            removal_reason: row.try_get("removal_reason")?,
            removed_at: timestamp(&row.try_get::<String, _>("removed_at")?)?,
            return_date: optional_timestamp(row.try_get("return_date")?)?,
            notes: row.try_get("notes")?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO removed_parts
        (id, service_id, technician_id, part_name, removal_reason, removed_at, return_date, notes)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM removed_parts WHERE id = ?";
const SELECT_BY_SERVICE: &str =
    "SELECT * FROM removed_parts WHERE service_id = ? ORDER BY removed_at ASC";

const UPDATE_RETURN: &str = r"
    UPDATE removed_parts
    SET return_date = ?, notes = ?
    WHERE id = ? AND return_date IS NULL
";

/// `SQLite`-backed removed-part repository.
pub struct SqliteRemovedPartRepository {
    pool: SqlitePool,
}

impl SqliteRemovedPartRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RemovedPartRepository for SqliteRemovedPartRepository {
    async fn record(&self, part: RemovedPart) -> Result<RemovedPart, RepairDeskError> {
        sqlx::query(INSERT)
            .bind(part.id.as_uuid())
            .bind(part.service_id.as_uuid())
            .bind(part.technician_id.as_uuid())
            .bind(&part.part_name)
            .bind(&part.removal_reason)
            .bind(stored(part.removed_at))
            .bind(stored_optional(part.return_date))
            .bind(&part.notes)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(part)
    }

    async fn get_by_id(&self, id: RemovedPartId) -> Result<Option<RemovedPart>, RepairDeskError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn find_by_service(&self, service: ServiceId) -> Result<Vec<RemovedPart>, RepairDeskError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_SERVICE)
            .bind(service.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn save_return(&self, part: &RemovedPart) -> Result<bool, RepairDeskError> {
        let result = sqlx::query(UPDATE_RETURN)
            .bind(stored_optional(part.return_date))
            .bind(&part.notes)
            .bind(part.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }
}
