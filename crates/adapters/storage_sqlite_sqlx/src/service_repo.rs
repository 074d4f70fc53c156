//! `SQLite` implementation of [`ServiceRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use repairdesk_app::ports::ServiceRepository;
use repairdesk_domain::error::{InvalidTransitionError, NotFoundError, RepairDeskError};
use repairdesk_domain::id::{ApplianceId, ClientId, ServiceId, StatusChangeId, UserId};
use repairdesk_domain::service::{Service, StatusChange, WarrantyStatus};

use crate::columns::{
    decode_error, optional_timestamp, stored, stored_optional, timestamp, unsigned, variant,
};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Service);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let warranty: String = row.try_get("warranty_status")?;
        let used_parts: String = row.try_get("used_parts")?;
        let fixed: Option<i64> = row.try_get("is_completely_fixed")?;

        let warranty_status: WarrantyStatus =
            serde_json::from_str(&format!("\"{warranty}\"")).map_err(decode_error)?;
        let used_parts: Vec<String> = serde_json::from_str(&used_parts).map_err(decode_error)?;

        Ok(Self(Service {
            id: ServiceId::from_uuid(row.try_get("id")?),
            client_id: ClientId::from_uuid(row.try_get("client_id")?),
            appliance_id: ApplianceId::from_uuid(row.try_get("appliance_id")?),
            technician_id: row
                .try_get::<Option<uuid::Uuid>, _>("technician_id")?
                .map(UserId::from_uuid),
            business_partner_id: row
                .try_get::<Option<uuid::Uuid>, _>("business_partner_id")?
                .map(UserId::from_uuid),
            created_by: UserId::from_uuid(row.try_get("created_by")?),
            status: variant(&status)?,
            warranty_status,
            description: row.try_get("description")?,
            technician_notes: row.try_get("technician_notes")?,
            used_parts,
            cost: row.try_get("cost")?,
            is_completely_fixed: fixed.map(|v| v != 0),
            scheduled_date: optional_timestamp(row.try_get("scheduled_date")?)?,
            completed_date: optional_timestamp(row.try_get("completed_date")?)?,
            client_not_available_count: unsigned(
                row.try_get("client_not_available_count")?,
                "client_not_available_count",
            )?,
            revision: unsigned(row.try_get("revision")?, "revision")?,
            created_at: timestamp(&row.try_get::<String, _>("created_at")?)?,
            updated_at: timestamp(&row.try_get::<String, _>("updated_at")?)?,
        }))
    }
}

struct ChangeWrapper(StatusChange);

impl<'r> FromRow<'r, SqliteRow> for ChangeWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let operation: String = row.try_get("operation")?;
        let from: String = row.try_get("from_status")?;
        let to: String = row.try_get("to_status")?;

        Ok(Self(StatusChange {
            id: StatusChangeId::from_uuid(row.try_get("id")?),
            service_id: ServiceId::from_uuid(row.try_get("service_id")?),
            sequence: unsigned(row.try_get("sequence")?, "sequence")?,
            operation: variant(&operation)?,
            from: variant(&from)?,
            to: variant(&to)?,
            actor: UserId::from_uuid(row.try_get("actor")?),
            at: timestamp(&row.try_get::<String, _>("at")?)?,
            notes: row.try_get("notes")?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO services (
        id, client_id, appliance_id, technician_id, business_partner_id, created_by,
        status, warranty_status, description, technician_notes, used_parts, cost,
        is_completely_fixed, scheduled_date, completed_date, client_not_available_count,
        revision, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM services WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM services ORDER BY created_at ASC";
const SELECT_BY_TECHNICIAN: &str =
    "SELECT * FROM services WHERE technician_id = ? ORDER BY created_at ASC";
const SELECT_BY_PARTNER: &str =
    "SELECT * FROM services WHERE business_partner_id = ? ORDER BY created_at ASC";
const EXISTS: &str = "SELECT 1 FROM services WHERE id = ?";

// Compare-and-set on (revision, status, absences): a concurrent writer makes
// this a no-op.
const UPDATE_TRANSITION: &str = r"
    UPDATE services
    SET status = ?, technician_id = ?, technician_notes = ?, cost = ?,
        is_completely_fixed = ?, scheduled_date = ?, completed_date = ?,
        revision = ?, updated_at = ?
    WHERE id = ? AND revision = ? AND status = ? AND client_not_available_count = ?
";

const INSERT_CHANGE: &str = r"
    INSERT INTO service_status_changes
        (id, service_id, sequence, operation, from_status, to_status, actor, at, notes)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const UPDATE_ABSENCE: &str = r"
    UPDATE services
    SET technician_notes = ?, client_not_available_count = client_not_available_count + 1,
        updated_at = ?
    WHERE id = ? AND revision = ? AND status = ? AND client_not_available_count = ?
";

const SELECT_HISTORY: &str =
    "SELECT * FROM service_status_changes WHERE service_id = ? ORDER BY sequence ASC";

/// `SQLite`-backed service repository.
pub struct SqliteServiceRepository {
    pool: SqlitePool,
}

impl SqliteServiceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find(&self, query: &'static str, id: uuid::Uuid) -> Result<Vec<Service>, RepairDeskError> {
        let rows: Vec<Wrapper> = sqlx::query_as(query)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

fn not_found(id: ServiceId) -> RepairDeskError {
    NotFoundError {
        entity: "Service",
        id: id.to_string(),
    }
    .into()
}

impl ServiceRepository for SqliteServiceRepository {
    async fn create(&self, service: Service) -> Result<Service, RepairDeskError> {
        let used_parts = serde_json::to_string(&service.used_parts).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(service.id.as_uuid())
            .bind(service.client_id.as_uuid())
            .bind(service.appliance_id.as_uuid())
            .bind(service.technician_id.map(UserId::as_uuid))
            .bind(service.business_partner_id.map(UserId::as_uuid))
            .bind(service.created_by.as_uuid())
            .bind(service.status.as_str())
            .bind(service.warranty_status.as_str())
            .bind(&service.description)
            .bind(&service.technician_notes)
            .bind(&used_parts)
            .bind(service.cost)
            .bind(service.is_completely_fixed)
            .bind(stored_optional(service.scheduled_date))
            .bind(stored_optional(service.completed_date))
            .bind(i64::from(service.client_not_available_count))
            .bind(i64::from(service.revision))
            .bind(stored(service.created_at))
            .bind(stored(service.updated_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(service)
    }

    async fn get_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepairDeskError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<Service>, RepairDeskError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_technician(&self, technician: UserId) -> Result<Vec<Service>, RepairDeskError> {
        self.find(SELECT_BY_TECHNICIAN, technician.as_uuid()).await
    }

    async fn find_by_business_partner(
        &self,
        partner: UserId,
    ) -> Result<Vec<Service>, RepairDeskError> {
        self.find(SELECT_BY_PARTNER, partner.as_uuid()).await
    }

    async fn save_transition(
        &self,
        service: &Service,
        change: &StatusChange,
    ) -> Result<(), RepairDeskError> {
        let expected = service.revision.saturating_sub(1);
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let result = sqlx::query(UPDATE_TRANSITION)
            .bind(service.status.as_str())
            .bind(service.technician_id.map(UserId::as_uuid))
            .bind(&service.technician_notes)
            .bind(service.cost)
            .bind(service.is_completely_fixed)
            .bind(stored_optional(service.scheduled_date))
            .bind(stored_optional(service.completed_date))
            .bind(i64::from(service.revision))
            .bind(stored(service.updated_at))
            .bind(service.id.as_uuid())
            .bind(i64::from(expected))
            .bind(change.from.as_str())
            .bind(i64::from(service.client_not_available_count))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query(EXISTS)
                .bind(service.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            return Err(match exists {
                Some(_) => InvalidTransitionError::Stale { expected }.into(),
                None => not_found(service.id),
            });
        }

        sqlx::query(INSERT_CHANGE)
            .bind(change.id.as_uuid())
            .bind(change.service_id.as_uuid())
            .bind(i64::from(change.sequence))
            .bind(change.operation.as_str())
            .bind(change.from.as_str())
            .bind(change.to.as_str())
            .bind(change.actor.as_uuid())
            .bind(stored(change.at))
            .bind(&change.notes)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn record_client_absence(&self, service: &Service) -> Result<(), RepairDeskError> {
        let previous = service.client_not_available_count.saturating_sub(1);

        let result = sqlx::query(UPDATE_ABSENCE)
            .bind(&service.technician_notes)
            .bind(stored(service.updated_at))
            .bind(service.id.as_uuid())
            .bind(i64::from(service.revision))
            .bind(service.status.as_str())
            .bind(i64::from(previous))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query(EXISTS)
                .bind(service.id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
            return Err(match exists {
                Some(_) => InvalidTransitionError::Stale {
                    expected: service.revision,
                }
                .into(),
                None => not_found(service.id),
            });
        }
        Ok(())
    }

    async fn history(&self, id: ServiceId) -> Result<Vec<StatusChange>, RepairDeskError> {
        let rows: Vec<ChangeWrapper> = sqlx::query_as(SELECT_HISTORY)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
