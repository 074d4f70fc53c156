//! Parts inventory: receiving stock and querying the catalogue.
//!
//! This service never changes quantities of existing parts; that is the
//! [`AllocationCoordinator`](super::allocation_coordinator::AllocationCoordinator)'s job.

use repairdesk_domain::activity::{ActivityKind, ActivityLogEntry};
use repairdesk_domain::error::{NotFoundError, RepairDeskError};
use repairdesk_domain::id::{PartId, UserId};
use repairdesk_domain::part::{AvailablePart, PartQuery, StockBalance};
use repairdesk_domain::role_gate::{AccessContext, Operation};

use crate::ports::{Directory, InventoryStore, InventoryTransaction};
use crate::services::authorize_actor;

/// A received spare-part order.
#[derive(Debug, Clone, Default)]
pub struct NewPart {
    pub part_name: String,
    pub part_number: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: u32,
    pub location: Option<String>,
}

/// Application service for the parts catalogue.
pub struct PartsInventory<I, D> {
    inventory: I,
    directory: D,
}

impl<I, D> PartsInventory<I, D>
where
    I: InventoryStore + Send + Sync,
    D: Directory + Send + Sync,
{
    pub fn new(inventory: I, directory: D) -> Self {
        Self {
            inventory,
            directory,
        }
    }

    /// Put a received order on the shelf as a new part.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for non-admins and
    /// [`RepairDeskError::Validation`] for an empty part name.
    #[tracing::instrument(skip(self, input), fields(part_name = %input.part_name))]
    pub async fn receive_part(
        &self,
        actor: UserId,
        input: NewPart,
    ) -> Result<AvailablePart, RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::ReceivePart,
            &AccessContext::none(),
        )
        .await?;

        let mut builder = AvailablePart::builder()
            .part_name(input.part_name)
            .quantity(input.quantity)
            .added_by(user.id);
        if let Some(number) = input.part_number {
            builder = builder.part_number(number);
        }
        if let Some(category) = input.category {
            builder = builder.category(category);
        }
        if let Some(manufacturer) = input.manufacturer {
            builder = builder.manufacturer(manufacturer);
        }
        if let Some(location) = input.location {
            builder = builder.location(location);
        }
        let part = builder.build()?;

        let mut tx = self.inventory.begin().await?;
        tx.insert_part(&part).await?;
        tx.append_activity_log(&ActivityLogEntry::new(
            part.id,
            ActivityKind::Received,
            user.id,
            0,
            part.quantity,
            part.created_at,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(part_id = %part.id, quantity = part.quantity, "part received");
        Ok(part)
    }

    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when no part has `id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_part(&self, actor: UserId, id: PartId) -> Result<AvailablePart, RepairDeskError> {
        self.authorize_read(actor).await?;
        self.load(id).await
    }

    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for actors without inventory access.
    pub async fn list_parts(&self, actor: UserId) -> Result<Vec<AvailablePart>, RepairDeskError> {
        self.authorize_read(actor).await?;
        let mut parts = self.inventory.get_all_parts().await?;
        parts.sort_by(|a, b| a.part_name.cmp(&b.part_name));
        Ok(parts)
    }

    /// Parts whose name, category, and manufacturer contain the given
    /// fragments, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for actors without inventory access.
    #[tracing::instrument(skip(self))]
    pub async fn search_parts(
        &self,
        actor: UserId,
        query: &PartQuery,
    ) -> Result<Vec<AvailablePart>, RepairDeskError> {
        self.authorize_read(actor).await?;
        let mut parts = self.inventory.search_parts(query).await?;
        parts.sort_by(|a, b| a.part_name.cmp(&b.part_name));
        Ok(parts)
    }

    /// Activity log of a part, oldest first. Entries outlive the part.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for actors without inventory access.
    pub async fn activity(
        &self,
        actor: UserId,
        part_id: PartId,
    ) -> Result<Vec<ActivityLogEntry>, RepairDeskError> {
        self.authorize_read(actor).await?;
        self.inventory.activity_for_part(part_id).await
    }

    /// Where a part's units are: on the shelf, with technicians, and how many
    /// were ever received.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when no part has `part_id`.
    #[tracing::instrument(skip(self))]
    pub async fn balance(
        &self,
        actor: UserId,
        part_id: PartId,
    ) -> Result<StockBalance, RepairDeskError> {
        self.authorize_read(actor).await?;

        // One snapshot for all three reads; dropped without commit.
        let mut tx = self.inventory.begin().await?;
        let part = tx.get_part(part_id).await?.ok_or_else(|| NotFoundError {
            entity: "AvailablePart",
            id: part_id.to_string(),
        })?;
        let allocated = tx.allocated_quantity(part_id).await?;
        let received = tx
            .activity_for_part(part_id)
            .await?
            .iter()
            .map(ActivityLogEntry::received_delta)
            .sum();

        Ok(StockBalance {
            part_id,
            in_stock: u64::from(part.quantity),
            allocated,
            received,
        })
    }

    async fn authorize_read(&self, actor: UserId) -> Result<(), RepairDeskError> {
        authorize_actor(
            &self.directory,
            actor,
            Operation::ReadInventory,
            &AccessContext::none(),
        )
        .await
        .map(|_| ())
    }

    async fn load(&self, id: PartId) -> Result<AvailablePart, RepairDeskError> {
        self.inventory.get_part(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "AvailablePart",
                id: id.to_string(),
            }
            .into()
        })
    }
}
