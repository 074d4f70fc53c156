//! Allocation coordinator: moves stock between the shelf and technicians.
//!
//! Every mutation runs inside one [`InventoryTransaction`]: the quantity
//! change, the allocation row, and the activity entry commit together or not
//! at all. Quantity checks are conditional updates in the store, so the
//! loser of a race sees [`InsufficientStockError`] instead of overselling.

use repairdesk_domain::activity::{ActivityKind, ActivityLogEntry};
use repairdesk_domain::allocation::{AllocationQuery, AllocationStatus, PartAllocation};
use repairdesk_domain::directory::Role;
use repairdesk_domain::error::{
    AlreadyReturnedError, ConflictError, ForbiddenError, InsufficientStockError, NotFoundError,
    PartInUseError, RepairDeskError, ValidationError,
};
use repairdesk_domain::id::{AllocationId, PartId, ServiceId, UserId};
use repairdesk_domain::notification::{Notification, NotificationKind};
use repairdesk_domain::part::{AvailablePart, QuantityUpdate};
use repairdesk_domain::role_gate::{self, AccessContext, Operation};
use repairdesk_domain::time::{Timestamp, now};

use crate::notifications::dispatch_best_effort;
use crate::ports::{
    Directory, InventoryStore, InventoryTransaction, NotificationDispatcher, ServiceRepository,
};
use crate::services::{authorize_actor, resolve_actor};

/// Parameters of [`AllocationCoordinator::allocate`].
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub part_id: PartId,
    pub technician_id: UserId,
    pub quantity: u32,
    pub service_id: Option<ServiceId>,
    pub notes: Option<String>,
}

/// Result of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub allocation: PartAllocation,
    pub remaining_quantity: u32,
}

/// Result of a successful return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub allocation: PartAllocation,
    pub part_quantity: u32,
}

/// Application service for the allocation ledger.
pub struct AllocationCoordinator<I, S, D, N> {
    inventory: I,
    services: S,
    directory: D,
    notifier: N,
}

impl<I, S, D, N> AllocationCoordinator<I, S, D, N>
where
    I: InventoryStore + Send + Sync,
    S: ServiceRepository + Send + Sync,
    D: Directory + Send + Sync,
    N: NotificationDispatcher + Send + Sync,
{
    pub fn new(inventory: I, services: S, directory: D, notifier: N) -> Self {
        Self {
            inventory,
            services,
            directory,
            notifier,
        }
    }

    /// Hand `quantity` units of a part to a technician.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] for a zero quantity or a
    /// recipient who is not an active technician,
    /// [`RepairDeskError::NotFound`] for a missing part or service,
    /// [`RepairDeskError::Forbidden`] when the actor may not allocate to that
    /// technician, and [`RepairDeskError::InsufficientStock`] when fewer units
    /// are on the shelf. Nothing is written on failure.
    #[tracing::instrument(
        skip(self, request),
        fields(part_id = %request.part_id, quantity = request.quantity)
    )]
    pub async fn allocate(
        &self,
        actor: UserId,
        request: AllocationRequest,
    ) -> Result<AllocationOutcome, RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::AllocatePart,
            &AccessContext::for_stock_holder(request.technician_id),
        )
        .await?;

        let at = now();
        let allocation = PartAllocation::new(
            request.part_id,
            request.technician_id,
            request.quantity,
            user.id,
            at,
        )?
        .with_service(request.service_id)
        .with_notes(request.notes);

        match self.directory.get_user(request.technician_id).await? {
            Some(technician) if technician.is_technician() => {}
            _ => {
                return Err(
                    ValidationError::NotATechnician(request.technician_id.to_string()).into(),
                );
            }
        }
        if let Some(service_id) = request.service_id
            && self.services.get_by_id(service_id).await?.is_none()
        {
            return Err(NotFoundError {
                entity: "Service",
                id: service_id.to_string(),
            }
            .into());
        }

        let mut tx = self.inventory.begin().await?;
        let (before, after) = match tx
            .decrement_part_quantity(request.part_id, request.quantity)
            .await?
        {
            QuantityUpdate::Applied { before, after } => (before, after),
            QuantityUpdate::Insufficient { available } => {
                tracing::info!(available, "allocation refused");
                return Err(InsufficientStockError {
                    part: request.part_id.to_string(),
                    available,
                    requested: u64::from(request.quantity),
                }
                .into());
            }
        };
        tx.insert_allocation(&allocation).await?;
        tx.append_activity_log(
            &ActivityLogEntry::new(
                request.part_id,
                ActivityKind::Allocated,
                user.id,
                before,
                after,
                at,
            )
            .with_allocation(allocation.id)
            .with_notes(allocation.allocation_notes.clone()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            allocation_id = %allocation.id,
            technician_id = %allocation.technician_id,
            remaining = after,
            "parts allocated"
        );

        let notification = Notification::new(
            NotificationKind::PartsAllocated,
            allocation.service_id,
            serde_json::json!({
                "allocation_id": allocation.id,
                "part_id": allocation.part_id,
                "technician_id": allocation.technician_id,
                "quantity": allocation.allocated_quantity,
                "remaining_quantity": after,
            }),
        );
        dispatch_best_effort(&self.notifier, notification).await;

        Ok(AllocationOutcome {
            allocation,
            remaining_quantity: after,
        })
    }

    /// Put an allocation's units back on the shelf.
    ///
    /// Allowed for admins and for the technician holding the allocation.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] for a missing allocation,
    /// [`RepairDeskError::Forbidden`] when the actor may not return it, and
    /// [`RepairDeskError::AlreadyReturned`] when it is already back; the part
    /// quantity is credited exactly once.
    #[tracing::instrument(skip(self, notes))]
    pub async fn mark_returned(
        &self,
        actor: UserId,
        allocation_id: AllocationId,
        returned_at: Option<Timestamp>,
        notes: Option<String>,
    ) -> Result<ReturnOutcome, RepairDeskError> {
        let operation = Operation::ReturnAllocation;
        let user = resolve_actor(&self.directory, actor, operation).await?;
        let mut allocation = self
            .inventory
            .get_allocation(allocation_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "PartAllocation",
                id: allocation_id.to_string(),
            })?;
        role_gate::authorize(
            &user,
            operation,
            &AccessContext::for_stock_holder(allocation.technician_id),
        )?;

        let at = returned_at.unwrap_or_else(now);
        allocation.mark_returned(at, notes)?;

        let mut tx = self.inventory.begin().await?;
        if !tx
            .update_allocation_status(&allocation, AllocationStatus::Allocated)
            .await?
        {
            return Err(AlreadyReturnedError {
                entity: "PartAllocation",
                id: allocation.id.to_string(),
            }
            .into());
        }
        let (before, after) = match tx
            .increment_part_quantity(allocation.part_id, allocation.allocated_quantity)
            .await?
        {
            QuantityUpdate::Applied { before, after } => (before, after),
            QuantityUpdate::Insufficient { available } => {
                return Err(ConflictError::StockOverflow {
                    part: allocation.part_id.to_string(),
                    available,
                    credited: allocation.allocated_quantity,
                }
                .into());
            }
        };
        tx.append_activity_log(
            &ActivityLogEntry::new(
                allocation.part_id,
                ActivityKind::Returned,
                user.id,
                before,
                after,
                at,
            )
            .with_allocation(allocation.id)
            .with_notes(allocation.return_notes.clone()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(allocation_id = %allocation.id, part_quantity = after, "allocation returned");
        Ok(ReturnOutcome {
            allocation,
            part_quantity: after,
        })
    }

    /// Correct a part's shelf quantity by `delta` (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] for a zero delta,
    /// [`RepairDeskError::Forbidden`] for non-admins,
    /// [`RepairDeskError::NotFound`] for a missing part, and
    /// [`RepairDeskError::InsufficientStock`] if the quantity would go below
    /// zero.
    #[tracing::instrument(skip(self, notes))]
    pub async fn adjust_quantity(
        &self,
        actor: UserId,
        part_id: PartId,
        delta: i64,
        notes: Option<String>,
    ) -> Result<AvailablePart, RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::AdjustStock,
            &AccessContext::none(),
        )
        .await?;
        if delta == 0 {
            return Err(ValidationError::ZeroAdjustment.into());
        }

        let mut tx = self.inventory.begin().await?;
        let (before, after) = match tx.adjust_part_quantity(part_id, delta).await? {
            QuantityUpdate::Applied { before, after } => (before, after),
            QuantityUpdate::Insufficient { available } => {
                return Err(InsufficientStockError {
                    part: part_id.to_string(),
                    available,
                    requested: delta.unsigned_abs(),
                }
                .into());
            }
        };
        tx.append_activity_log(
            &ActivityLogEntry::new(part_id, ActivityKind::Adjusted, user.id, before, after, now())
                .with_notes(notes),
        )
        .await?;
        let part = tx.get_part(part_id).await?.ok_or_else(|| NotFoundError {
            entity: "AvailablePart",
            id: part_id.to_string(),
        })?;
        tx.commit().await?;

        tracing::info!(%part_id, before, after, "stock adjusted");
        Ok(part)
    }

    /// Remove a part that no technician is holding (admin only).
    ///
    /// Returned allocations and activity entries keep referring to the part.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::PartInUse`] while any allocation of the part
    /// is outstanding, [`RepairDeskError::NotFound`] for a missing part, and
    /// [`RepairDeskError::Forbidden`] for non-admins.
    #[tracing::instrument(skip(self))]
    pub async fn delete_part(&self, actor: UserId, part_id: PartId) -> Result<(), RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::DeletePart,
            &AccessContext::none(),
        )
        .await?;

        // Write first so the transaction holds the write lock before it reads.
        let mut tx = self.inventory.begin().await?;
        let Some(quantity) = tx.delete_unused_part(part_id).await? else {
            let outstanding = tx.count_outstanding_allocations(part_id).await?;
            if outstanding > 0 {
                return Err(PartInUseError {
                    part: part_id.to_string(),
                    outstanding,
                }
                .into());
            }
            return Err(NotFoundError {
                entity: "AvailablePart",
                id: part_id.to_string(),
            }
            .into());
        };
        tx.append_activity_log(&ActivityLogEntry::new(
            part_id,
            ActivityKind::Deleted,
            user.id,
            quantity,
            0,
            now(),
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(%part_id, "part deleted");
        Ok(())
    }

    /// Allocations matching `query`. Technicians only see their own.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for actors without inventory
    /// access, or a technician asking for someone else's allocations.
    #[tracing::instrument(skip(self))]
    pub async fn list_allocations(
        &self,
        actor: UserId,
        mut query: AllocationQuery,
    ) -> Result<Vec<PartAllocation>, RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::ReadInventory,
            &AccessContext::none(),
        )
        .await?;
        if user.role == Role::Technician {
            if query.technician_id.is_some_and(|id| id != user.id) {
                return Err(ForbiddenError {
                    actor: user.id.to_string(),
                    operation: Operation::ReadInventory.as_str(),
                }
                .into());
            }
            query.technician_id = Some(user.id);
        }
        let mut allocations = self.inventory.find_allocations(&query).await?;
        allocations.sort_by_key(|a| a.created_at);
        Ok(allocations)
    }
}
