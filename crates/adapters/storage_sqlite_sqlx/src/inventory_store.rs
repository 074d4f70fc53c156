//! `SQLite` implementation of [`InventoryStore`].
//!
//! Every stock change is a single conditional `UPDATE ... RETURNING` so the
//! database decides whether enough units are left. Writes run inside a
//! `sqlx` transaction that rolls back when dropped uncommitted.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Sqlite, SqlitePool};

use repairdesk_app::ports::{InventoryStore, InventoryTransaction};
use repairdesk_domain::activity::ActivityLogEntry;
use repairdesk_domain::allocation::{AllocationQuery, AllocationStatus, PartAllocation};
use repairdesk_domain::error::{NotFoundError, RepairDeskError};
use repairdesk_domain::id::{ActivityId, AllocationId, PartId, ServiceId, UserId};
use repairdesk_domain::part::{AvailablePart, PartQuery, QuantityUpdate};

use crate::columns::{optional_timestamp, stored, stored_optional, timestamp, unsigned, variant};
use crate::error::StorageError;

struct PartRow(AvailablePart);

impl<'r> FromRow<'r, SqliteRow> for PartRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(AvailablePart {
            id: PartId::from_uuid(row.try_get("id")?),
            part_name: row.try_get("part_name")?,
            part_number: row.try_get("part_number")?,
            category: row.try_get("category")?,
            manufacturer: row.try_get("manufacturer")?,
            quantity: unsigned(row.try_get("quantity")?, "quantity")?,
            location: row.try_get("location")?,
            added_by: UserId::from_uuid(row.try_get("added_by")?),
            created_at: timestamp(&row.try_get::<String, _>("created_at")?)?,
        }))
    }
}

struct AllocationRow(PartAllocation);

impl<'r> FromRow<'r, SqliteRow> for AllocationRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self(PartAllocation {
            id: AllocationId::from_uuid(row.try_get("id")?),
            part_id: PartId::from_uuid(row.try_get("part_id")?),
            service_id: row
                .try_get::<Option<uuid::Uuid>, _>("service_id")?
                .map(ServiceId::from_uuid),
            technician_id: UserId::from_uuid(row.try_get("technician_id")?),
            allocated_quantity: unsigned(row.try_get("allocated_quantity")?, "allocated_quantity")?,
            allocated_by: UserId::from_uuid(row.try_get("allocated_by")?),
            status: variant(&status)?,
            allocation_notes: row.try_get("allocation_notes")?,
            created_at: timestamp(&row.try_get::<String, _>("created_at")?)?,
            returned_at: optional_timestamp(row.try_get("returned_at")?)?,
            return_notes: row.try_get("return_notes")?,
        }))
    }
}

struct ActivityRow(ActivityLogEntry);

impl<'r> FromRow<'r, SqliteRow> for ActivityRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        Ok(Self(ActivityLogEntry {
            id: ActivityId::from_uuid(row.try_get("id")?),
            part_id: PartId::from_uuid(row.try_get("part_id")?),
            allocation_id: row
                .try_get::<Option<uuid::Uuid>, _>("allocation_id")?
                .map(AllocationId::from_uuid),
            kind: variant(&kind)?,
            actor: UserId::from_uuid(row.try_get("actor")?),
            quantity_before: unsigned(row.try_get("quantity_before")?, "quantity_before")?,
            quantity_after: unsigned(row.try_get("quantity_after")?, "quantity_after")?,
            notes: row.try_get("notes")?,
            recorded_at: timestamp(&row.try_get::<String, _>("recorded_at")?)?,
        }))
    }
}

const SELECT_PART: &str = "SELECT * FROM available_parts WHERE id = ?";
const SELECT_ALL_PARTS: &str = "SELECT * FROM available_parts ORDER BY part_name ASC";
const SEARCH_PARTS: &str = r"
    SELECT * FROM available_parts
    WHERE (?1 IS NULL OR instr(lower(part_name), lower(?1)) > 0)
      AND (?2 IS NULL OR instr(lower(category), lower(?2)) > 0)
      AND (?3 IS NULL OR instr(lower(manufacturer), lower(?3)) > 0)
    ORDER BY part_name ASC
";
const INSERT_PART: &str = r"
    INSERT INTO available_parts
        (id, part_name, part_number, category, manufacturer, quantity, location, added_by, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const SELECT_QUANTITY: &str = "SELECT quantity FROM available_parts WHERE id = ?";
const DECREMENT: &str = r"
    UPDATE available_parts SET quantity = quantity - ?1
    WHERE id = ?2 AND quantity >= ?1
    RETURNING quantity
";
const INCREMENT: &str = r"
    UPDATE available_parts SET quantity = quantity + ?1
    WHERE id = ?2 AND quantity + ?1 <= 4294967295
    RETURNING quantity
";
const ADJUST: &str = r"
    UPDATE available_parts SET quantity = quantity + ?1
    WHERE id = ?2 AND quantity + ?1 BETWEEN 0 AND 4294967295
    RETURNING quantity
";
const DELETE_UNUSED_PART: &str = r"
    DELETE FROM available_parts
    WHERE id = ?1 AND NOT EXISTS (
        SELECT 1 FROM part_allocations WHERE part_id = ?1 AND status = 'allocated'
    )
    RETURNING quantity
";

const SELECT_ALLOCATION: &str = "SELECT * FROM part_allocations WHERE id = ?";
const FIND_ALLOCATIONS: &str = r"
    SELECT * FROM part_allocations
    WHERE (?1 IS NULL OR part_id = ?1)
      AND (?2 IS NULL OR technician_id = ?2)
      AND (?3 IS NULL OR service_id = ?3)
      AND (?4 IS NULL OR status = ?4)
    ORDER BY created_at ASC
";
const INSERT_ALLOCATION: &str = r"
    INSERT INTO part_allocations
        (id, part_id, service_id, technician_id, allocated_quantity, allocated_by, status,
         allocation_notes, created_at, returned_at, return_notes)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const UPDATE_ALLOCATION_STATUS: &str = r"
    UPDATE part_allocations
    SET status = ?, returned_at = ?, return_notes = ?
    WHERE id = ? AND status = ?
";
const COUNT_OUTSTANDING: &str =
    "SELECT COUNT(*) FROM part_allocations WHERE part_id = ? AND status = 'allocated'";
const SUM_OUTSTANDING: &str = r"
    SELECT COALESCE(SUM(allocated_quantity), 0) FROM part_allocations
    WHERE part_id = ? AND status = 'allocated'
";

const INSERT_ACTIVITY: &str = r"
    INSERT INTO part_activity_log
        (id, part_id, allocation_id, kind, actor, quantity_before, quantity_after, notes, recorded_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const SELECT_ACTIVITY: &str = r"
    SELECT * FROM part_activity_log
    WHERE part_id = ?
    ORDER BY recorded_at ASC, rowid ASC
";

fn part_not_found(id: PartId) -> RepairDeskError {
    NotFoundError {
        entity: "AvailablePart",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed parts ledger.
pub struct SqliteInventoryStore {
    pool: SqlitePool,
}

impl SqliteInventoryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// An open ledger transaction. Dropping it without [`commit`](InventoryTransaction::commit)
/// rolls every write back.
pub struct SqliteInventoryTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl SqliteInventoryTransaction {
    async fn conditional_update(
        &mut self,
        statement: &'static str,
        id: PartId,
        amount: i64,
    ) -> Result<Option<u32>, RepairDeskError> {
        let row: Option<(i64,)> = sqlx::query_as(statement)
            .bind(amount)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        row.map(|(quantity,)| unsigned(quantity, "quantity"))
            .transpose()
            .map_err(|err| StorageError::from(err).into())
    }

    async fn current_quantity(&mut self, id: PartId) -> Result<u32, RepairDeskError> {
        let row: Option<(i64,)> = sqlx::query_as(SELECT_QUANTITY)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some((quantity,)) => Ok(unsigned(quantity, "quantity").map_err(StorageError::from)?),
            None => Err(part_not_found(id)),
        }
    }
}

impl InventoryStore for SqliteInventoryStore {
    type Transaction = SqliteInventoryTransaction;

    async fn begin(&self) -> Result<SqliteInventoryTransaction, RepairDeskError> {
        let tx = self.pool.begin().await.map_err(StorageError::from)?;
        Ok(SqliteInventoryTransaction { tx })
    }

    async fn get_part(&self, id: PartId) -> Result<Option<AvailablePart>, RepairDeskError> {
        let row: Option<PartRow> = sqlx::query_as(SELECT_PART)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn get_all_parts(&self) -> Result<Vec<AvailablePart>, RepairDeskError> {
        let rows: Vec<PartRow> = sqlx::query_as(SELECT_ALL_PARTS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn search_parts(&self, query: &PartQuery) -> Result<Vec<AvailablePart>, RepairDeskError> {
        let rows: Vec<PartRow> = sqlx::query_as(SEARCH_PARTS)
            .bind(query.name.as_deref())
            .bind(query.category.as_deref())
            .bind(query.manufacturer.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<PartAllocation>, RepairDeskError> {
        let row: Option<AllocationRow> = sqlx::query_as(SELECT_ALLOCATION)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn find_allocations(
        &self,
        query: &AllocationQuery,
    ) -> Result<Vec<PartAllocation>, RepairDeskError> {
        let rows: Vec<AllocationRow> = sqlx::query_as(FIND_ALLOCATIONS)
            .bind(query.part_id.map(PartId::as_uuid))
            .bind(query.technician_id.map(UserId::as_uuid))
            .bind(query.service_id.map(ServiceId::as_uuid))
            .bind(query.status.map(AllocationStatus::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn activity_for_part(&self, part: PartId) -> Result<Vec<ActivityLogEntry>, RepairDeskError> {
        let rows: Vec<ActivityRow> = sqlx::query_as(SELECT_ACTIVITY)
            .bind(part.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

impl InventoryTransaction for SqliteInventoryTransaction {
    async fn get_part(&mut self, id: PartId) -> Result<Option<AvailablePart>, RepairDeskError> {
        let row: Option<PartRow> = sqlx::query_as(SELECT_PART)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn insert_part(&mut self, part: &AvailablePart) -> Result<(), RepairDeskError> {
        sqlx::query(INSERT_PART)
            .bind(part.id.as_uuid())
            .bind(&part.part_name)
            .bind(&part.part_number)
            .bind(&part.category)
            .bind(&part.manufacturer)
            .bind(i64::from(part.quantity))
            .bind(&part.location)
            .bind(part.added_by.as_uuid())
            .bind(stored(part.created_at))
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn decrement_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        match self.conditional_update(DECREMENT, id, i64::from(amount)).await? {
            Some(after) => Ok(QuantityUpdate::Applied {
                before: after + amount,
                after,
            }),
            None => Ok(QuantityUpdate::Insufficient {
                available: self.current_quantity(id).await?,
            }),
        }
    }

    async fn increment_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        match self.conditional_update(INCREMENT, id, i64::from(amount)).await? {
            Some(after) => Ok(QuantityUpdate::Applied {
                before: after - amount,
                after,
            }),
            None => Ok(QuantityUpdate::Insufficient {
                available: self.current_quantity(id).await?,
            }),
        }
    }

    async fn adjust_part_quantity(
        &mut self,
        id: PartId,
        delta: i64,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        match self.conditional_update(ADJUST, id, delta).await? {
            Some(after) => {
                let before = unsigned(i64::from(after) - delta, "quantity")
                    .map_err(StorageError::from)?;
                Ok(QuantityUpdate::Applied { before, after })
            }
            None => Ok(QuantityUpdate::Insufficient {
                available: self.current_quantity(id).await?,
            }),
        }
    }

    async fn get_allocation(
        &mut self,
        id: AllocationId,
    ) -> Result<Option<PartAllocation>, RepairDeskError> {
        let row: Option<AllocationRow> = sqlx::query_as(SELECT_ALLOCATION)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn insert_allocation(&mut self, allocation: &PartAllocation) -> Result<(), RepairDeskError> {
        sqlx::query(INSERT_ALLOCATION)
            .bind(allocation.id.as_uuid())
            .bind(allocation.part_id.as_uuid())
            .bind(allocation.service_id.map(ServiceId::as_uuid))
            .bind(allocation.technician_id.as_uuid())
            .bind(i64::from(allocation.allocated_quantity))
            .bind(allocation.allocated_by.as_uuid())
            .bind(allocation.status.as_str())
            .bind(&allocation.allocation_notes)
            .bind(stored(allocation.created_at))
            .bind(stored_optional(allocation.returned_at))
            .bind(&allocation.return_notes)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn update_allocation_status(
        &mut self,
        allocation: &PartAllocation,
        expected: AllocationStatus,
    ) -> Result<bool, RepairDeskError> {
        let result = sqlx::query(UPDATE_ALLOCATION_STATUS)
            .bind(allocation.status.as_str())
            .bind(stored_optional(allocation.returned_at))
            .bind(&allocation.return_notes)
            .bind(allocation.id.as_uuid())
            .bind(expected.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_outstanding_allocations(&mut self, part: PartId) -> Result<u64, RepairDeskError> {
        let (count,): (i64,) = sqlx::query_as(COUNT_OUTSTANDING)
            .bind(part.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn allocated_quantity(&mut self, part: PartId) -> Result<u64, RepairDeskError> {
        let (sum,): (i64,) = sqlx::query_as(SUM_OUTSTANDING)
            .bind(part.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(u64::try_from(sum).unwrap_or_default())
    }

    async fn activity_for_part(
        &mut self,
        part: PartId,
    ) -> Result<Vec<ActivityLogEntry>, RepairDeskError> {
        let rows: Vec<ActivityRow> = sqlx::query_as(SELECT_ACTIVITY)
            .bind(part.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn delete_unused_part(&mut self, id: PartId) -> Result<Option<u32>, RepairDeskError> {
        let row: Option<(i64,)> = sqlx::query_as(DELETE_UNUSED_PART)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        row.map(|(quantity,)| unsigned(quantity, "quantity"))
            .transpose()
            .map_err(|err| StorageError::from(err).into())
    }

    async fn append_activity_log(&mut self, entry: &ActivityLogEntry) -> Result<(), RepairDeskError> {
        sqlx::query(INSERT_ACTIVITY)
            .bind(entry.id.as_uuid())
            .bind(entry.part_id.as_uuid())
            .bind(entry.allocation_id.map(AllocationId::as_uuid))
            .bind(entry.kind.as_str())
            .bind(entry.actor.as_uuid())
            .bind(i64::from(entry.quantity_before))
            .bind(i64::from(entry.quantity_after))
            .bind(&entry.notes)
            .bind(stored(entry.recorded_at))
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn commit(self) -> Result<(), RepairDeskError> {
        self.tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pool::{file_database, memory_database};
    use repairdesk_domain::activity::ActivityKind;
    use repairdesk_domain::time::now;

    async fn setup() -> SqliteInventoryStore {
        SqliteInventoryStore::new(memory_database().await.pool().clone())
    }

    async fn seed_part(store: &SqliteInventoryStore, quantity: u32) -> AvailablePart {
        let part = AvailablePart::builder()
            .part_name("Drain pump")
            .category("Washer")
            .manufacturer("Bosch")
            .quantity(quantity)
            .added_by(UserId::new())
            .build()
            .unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_part(&part).await.unwrap();
        tx.commit().await.unwrap();
        part
    }

    #[tokio::test]
    async fn should_decrement_only_when_enough_stock() {
        let store = setup().await;
        let part = seed_part(&store, 5).await;

        let mut tx = store.begin().await.unwrap();
        let first = tx.decrement_part_quantity(part.id, 3).await.unwrap();
        let second = tx.decrement_part_quantity(part.id, 3).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, QuantityUpdate::Applied { before: 5, after: 2 });
        assert_eq!(second, QuantityUpdate::Insufficient { available: 2 });
        assert_eq!(store.get_part(part.id).await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn should_return_not_found_when_decrementing_missing_part() {
        let store = setup().await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.decrement_part_quantity(PartId::new(), 1).await;

        assert!(matches!(result, Err(RepairDeskError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_roll_back_when_transaction_dropped() {
        let store = setup().await;
        let part = seed_part(&store, 4).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.decrement_part_quantity(part.id, 4).await.unwrap();
            let allocation =
                PartAllocation::new(part.id, UserId::new(), 4, UserId::new(), now()).unwrap();
            tx.insert_allocation(&allocation).await.unwrap();
        }

        assert_eq!(store.get_part(part.id).await.unwrap().unwrap().quantity, 4);
        assert!(
            store
                .find_allocations(&AllocationQuery::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn should_adjust_within_bounds() {
        let store = setup().await;
        let part = seed_part(&store, 2).await;

        let mut tx = store.begin().await.unwrap();
        let down = tx.adjust_part_quantity(part.id, -3).await.unwrap();
        let up = tx.adjust_part_quantity(part.id, 10).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(down, QuantityUpdate::Insufficient { available: 2 });
        assert_eq!(up, QuantityUpdate::Applied { before: 2, after: 12 });
    }

    #[tokio::test]
    async fn should_flip_allocation_status_once() {
        let store = setup().await;
        let part = seed_part(&store, 3).await;
        let allocation =
            PartAllocation::new(part.id, UserId::new(), 1, UserId::new(), now()).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_allocation(&allocation).await.unwrap();
        tx.commit().await.unwrap();

        let mut returned = allocation.clone();
        returned.mark_returned(now(), Some("unused".to_string())).unwrap();

        let mut tx = store.begin().await.unwrap();
        let first = tx
            .update_allocation_status(&returned, AllocationStatus::Allocated)
            .await
            .unwrap();
        let second = tx
            .update_allocation_status(&returned, AllocationStatus::Allocated)
            .await
            .unwrap();
        let outstanding = tx.count_outstanding_allocations(part.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(outstanding, 0);
        let stored = store.get_allocation(allocation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AllocationStatus::Returned);
        assert_eq!(stored.return_notes.as_deref(), Some("unused"));
    }

    #[tokio::test]
    async fn should_filter_allocations_by_every_given_field() {
        let store = setup().await;
        let part = seed_part(&store, 10).await;
        let technician = UserId::new();
        let mine = PartAllocation::new(part.id, technician, 2, UserId::new(), now()).unwrap();
        let theirs = PartAllocation::new(part.id, UserId::new(), 1, UserId::new(), now()).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_allocation(&mine).await.unwrap();
        tx.insert_allocation(&theirs).await.unwrap();
        tx.commit().await.unwrap();

        let found = store
            .find_allocations(&AllocationQuery {
                part_id: Some(part.id),
                technician_id: Some(technician),
                status: Some(AllocationStatus::Allocated),
                ..AllocationQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mine.id);
    }

    #[tokio::test]
    async fn should_search_parts_case_insensitively() {
        let store = setup().await;
        seed_part(&store, 1).await;

        let hits = store
            .search_parts(&PartQuery {
                name: Some("PUMP".to_string()),
                manufacturer: Some("bosch".to_string()),
                ..PartQuery::default()
            })
            .await
            .unwrap();
        let misses = store
            .search_parts(&PartQuery {
                category: Some("fridge".to_string()),
                ..PartQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn should_keep_activity_after_part_deleted() {
        let store = setup().await;
        let part = seed_part(&store, 3).await;
        let actor = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.append_activity_log(&ActivityLogEntry::new(
            part.id,
            ActivityKind::Received,
            actor,
            0,
            3,
            part.created_at,
        ))
        .await
        .unwrap();
        tx.append_activity_log(&ActivityLogEntry::new(
            part.id,
            ActivityKind::Deleted,
            actor,
            3,
            0,
            now(),
        ))
        .await
        .unwrap();
        assert_eq!(tx.delete_unused_part(part.id).await.unwrap(), Some(3));
        tx.commit().await.unwrap();

        assert!(store.get_part(part.id).await.unwrap().is_none());
        let log = store.activity_for_part(part.id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, ActivityKind::Received);
        assert_eq!(log[1].kind, ActivityKind::Deleted);
    }

    #[tokio::test]
    async fn should_refuse_credit_beyond_counter_range() {
        let store = setup().await;
        let part = seed_part(&store, u32::MAX - 1).await;

        let mut tx = store.begin().await.unwrap();
        let credit = tx.increment_part_quantity(part.id, 2).await.unwrap();
        let missing = tx.increment_part_quantity(PartId::new(), 1).await;

        assert_eq!(
            credit,
            QuantityUpdate::Insufficient {
                available: u32::MAX - 1
            }
        );
        assert!(matches!(missing, Err(RepairDeskError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_delete_part_only_without_outstanding_allocations() {
        let store = setup().await;
        let part = seed_part(&store, 3).await;
        let allocation =
            PartAllocation::new(part.id, UserId::new(), 2, UserId::new(), now()).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_allocation(&allocation).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let blocked = tx.delete_unused_part(part.id).await.unwrap();
        let held = tx.allocated_quantity(part.id).await.unwrap();
        let mut returned = allocation.clone();
        returned.mark_returned(now(), None).unwrap();
        tx.update_allocation_status(&returned, AllocationStatus::Allocated)
            .await
            .unwrap();
        let deleted = tx.delete_unused_part(part.id).await.unwrap();
        let again = tx.delete_unused_part(part.id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(blocked, None);
        assert_eq!(held, 2);
        assert_eq!(deleted, Some(3));
        assert_eq!(again, None);
        assert!(store.get_part(part.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_read_activity_staged_in_transaction() {
        let store = setup().await;
        let part = seed_part(&store, 3).await;

        let mut tx = store.begin().await.unwrap();
        tx.append_activity_log(&ActivityLogEntry::new(
            part.id,
            ActivityKind::Received,
            UserId::new(),
            0,
            3,
            part.created_at,
        ))
        .await
        .unwrap();
        let staged = tx.activity_for_part(part.id).await.unwrap();
        drop(tx);

        assert_eq!(staged.len(), 1);
        assert!(store.activity_for_part(part.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_never_oversell_under_concurrent_transactions() {
        let store = Arc::new(setup().await);
        let part_id = seed_part(&store, 7).await.id;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let update = tx.decrement_part_quantity(part_id, 2).await.unwrap();
                tx.commit().await.unwrap();
                matches!(update, QuantityUpdate::Applied { .. })
            });
        }

        let mut granted = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(store.get_part(part_id).await.unwrap().unwrap().quantity, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_never_oversell_across_pooled_connections() {
        let (db, _dir) = file_database(5).await;
        let store = Arc::new(SqliteInventoryStore::new(db.pool().clone()));
        let part_id = seed_part(&store, 7).await.id;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                let mut tx = store.begin().await?;
                let update = tx.decrement_part_quantity(part_id, 2).await?;
                if let QuantityUpdate::Applied { .. } = update {
                    let allocation =
                        PartAllocation::new(part_id, UserId::new(), 2, UserId::new(), now())?;
                    tx.insert_allocation(&allocation).await?;
                }
                tx.commit().await?;
                Ok::<_, RepairDeskError>(matches!(update, QuantityUpdate::Applied { .. }))
            });
        }

        let mut granted = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap().unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(store.get_part(part_id).await.unwrap().unwrap().quantity, 1);
        let allocations = store
            .find_allocations(&AllocationQuery {
                part_id: Some(part_id),
                ..AllocationQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(allocations.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_settle_deletion_racing_allocation_without_storage_errors() {
        let (db, _dir) = file_database(5).await;
        let store = Arc::new(SqliteInventoryStore::new(db.pool().clone()));

        for _ in 0..10 {
            let part_id = seed_part(&store, 5).await.id;

            let allocate = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut tx = store.begin().await?;
                    tx.decrement_part_quantity(part_id, 1).await?;
                    let allocation =
                        PartAllocation::new(part_id, UserId::new(), 1, UserId::new(), now())?;
                    tx.insert_allocation(&allocation).await?;
                    tx.commit().await
                })
            };
            let delete = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut tx = store.begin().await?;
                    let deleted = tx.delete_unused_part(part_id).await?;
                    tx.commit().await?;
                    Ok::<_, RepairDeskError>(deleted.is_some())
                })
            };

            let allocated = allocate.await.unwrap();
            let deleted = delete.await.unwrap().unwrap();

            let allocations = store
                .find_allocations(&AllocationQuery {
                    part_id: Some(part_id),
                    ..AllocationQuery::default()
                })
                .await
                .unwrap();
            let remaining = store.get_part(part_id).await.unwrap();
            if deleted {
                assert!(matches!(allocated, Err(RepairDeskError::NotFound(_))));
                assert!(allocations.is_empty());
                assert!(remaining.is_none());
            } else {
                assert!(allocated.is_ok());
                assert_eq!(allocations.len(), 1);
                assert_eq!(remaining.unwrap().quantity, 4);
            }
        }
    }
}
