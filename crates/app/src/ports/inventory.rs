//! Inventory port: the spare-parts ledger store.
//!
//! Reads go straight to [`InventoryStore`]. Every mutation goes through an
//! [`InventoryTransaction`] obtained from [`InventoryStore::begin`]: either all
//! of its writes land on [`InventoryTransaction::commit`], or none do when the
//! transaction is dropped.
//!
//! Quantity changes are conditional updates evaluated by the store itself,
//! never read-then-write in the caller, so two transactions racing for the
//! same units cannot both succeed.

use std::future::Future;
use std::sync::Arc;

use repairdesk_domain::activity::ActivityLogEntry;
use repairdesk_domain::allocation::{AllocationQuery, AllocationStatus, PartAllocation};
use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::{AllocationId, PartId};
use repairdesk_domain::part::{AvailablePart, PartQuery, QuantityUpdate};

/// Read access to parts, allocations, and the activity log, plus the entry
/// point for atomic writes.
pub trait InventoryStore {
    /// The unit of work returned by [`begin`](Self::begin).
    type Transaction: InventoryTransaction + Send;

    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepairDeskError>> + Send;

    fn get_part(
        &self,
        id: PartId,
    ) -> impl Future<Output = Result<Option<AvailablePart>, RepairDeskError>> + Send;

    fn get_all_parts(
        &self,
    ) -> impl Future<Output = Result<Vec<AvailablePart>, RepairDeskError>> + Send;

    fn search_parts(
        &self,
        query: &PartQuery,
    ) -> impl Future<Output = Result<Vec<AvailablePart>, RepairDeskError>> + Send;

    fn get_allocation(
        &self,
        id: AllocationId,
    ) -> impl Future<Output = Result<Option<PartAllocation>, RepairDeskError>> + Send;

    fn find_allocations(
        &self,
        query: &AllocationQuery,
    ) -> impl Future<Output = Result<Vec<PartAllocation>, RepairDeskError>> + Send;

    /// Activity entries for a part, oldest first.
    fn activity_for_part(
        &self,
        part: PartId,
    ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, RepairDeskError>> + Send;
}

/// One atomic unit of ledger writes.
pub trait InventoryTransaction {
    fn get_part(
        &mut self,
        id: PartId,
    ) -> impl Future<Output = Result<Option<AvailablePart>, RepairDeskError>> + Send;

    fn insert_part(
        &mut self,
        part: &AvailablePart,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send;

    /// Subtract `amount` only if at least `amount` units are on the shelf.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when the part does not exist.
    fn decrement_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> impl Future<Output = Result<QuantityUpdate, RepairDeskError>> + Send;

    /// Add `amount` units back to the shelf.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when the part does not exist.
    fn increment_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> impl Future<Output = Result<QuantityUpdate, RepairDeskError>> + Send;

    /// Shift the quantity by `delta`, only if the result stays non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when the part does not exist.
    fn adjust_part_quantity(
        &mut self,
        id: PartId,
        delta: i64,
    ) -> impl Future<Output = Result<QuantityUpdate, RepairDeskError>> + Send;

    fn get_allocation(
        &mut self,
        id: AllocationId,
    ) -> impl Future<Output = Result<Option<PartAllocation>, RepairDeskError>> + Send;

    fn insert_allocation(
        &mut self,
        allocation: &PartAllocation,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send;

    /// Compare-and-set: store `allocation`'s status, return time, and notes
    /// only if the stored status is still `expected`. Returns whether the
    /// write happened.
    fn update_allocation_status(
        &mut self,
        allocation: &PartAllocation,
        expected: AllocationStatus,
    ) -> impl Future<Output = Result<bool, RepairDeskError>> + Send;

    /// Number of `allocated`-status allocations referencing `part`.
    fn count_outstanding_allocations(
        &mut self,
        part: PartId,
    ) -> impl Future<Output = Result<u64, RepairDeskError>> + Send;

    /// Units held by `allocated`-status allocations of `part`.
    fn allocated_quantity(
        &mut self,
        part: PartId,
    ) -> impl Future<Output = Result<u64, RepairDeskError>> + Send;

    /// Activity entries for a part, oldest first, as seen by this transaction.
    fn activity_for_part(
        &mut self,
        part: PartId,
    ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, RepairDeskError>> + Send;

    /// Delete the part only if no allocation of it is outstanding, as one
    /// conditional write. Returns the quantity it had, or `None` when nothing
    /// was deleted (missing part or outstanding allocations).
    fn delete_unused_part(
        &mut self,
        id: PartId,
    ) -> impl Future<Output = Result<Option<u32>, RepairDeskError>> + Send;

    fn append_activity_log(
        &mut self,
        entry: &ActivityLogEntry,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send;

    /// Make every write of this transaction visible.
    fn commit(self) -> impl Future<Output = Result<(), RepairDeskError>> + Send;
}

impl<T: InventoryStore + Send + Sync> InventoryStore for Arc<T> {
    type Transaction = T::Transaction;

    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepairDeskError>> + Send {
        (**self).begin()
    }

    fn get_part(
        &self,
        id: PartId,
    ) -> impl Future<Output = Result<Option<AvailablePart>, RepairDeskError>> + Send {
        (**self).get_part(id)
    }

    fn get_all_parts(
        &self,
    ) -> impl Future<Output = Result<Vec<AvailablePart>, RepairDeskError>> + Send {
        (**self).get_all_parts()
    }

    fn search_parts(
        &self,
        query: &PartQuery,
    ) -> impl Future<Output = Result<Vec<AvailablePart>, RepairDeskError>> + Send {
        (**self).search_parts(query)
    }

    fn get_allocation(
        &self,
        id: AllocationId,
    ) -> impl Future<Output = Result<Option<PartAllocation>, RepairDeskError>> + Send {
        (**self).get_allocation(id)
    }

    fn find_allocations(
        &self,
        query: &AllocationQuery,
    ) -> impl Future<Output = Result<Vec<PartAllocation>, RepairDeskError>> + Send {
        (**self).find_allocations(query)
    }

    fn activity_for_part(
        &self,
        part: PartId,
    ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, RepairDeskError>> + Send {
        (**self).activity_for_part(part)
    }
}
