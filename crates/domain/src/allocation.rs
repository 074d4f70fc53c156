//! Part allocations: ledger entries moving stock from the shelf to a technician.

use serde::{Deserialize, Serialize};

use crate::error::{AlreadyReturnedError, RepairDeskError, ValidationError};
use crate::id::{AllocationId, PartId, ServiceId, UserId};
use crate::time::Timestamp;

/// Whether the allocated units are still with the technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Allocated,
    Returned,
}

impl AllocationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::Returned => "returned",
        }
    }
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AllocationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allocated" => Ok(Self::Allocated),
            "returned" => Ok(Self::Returned),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A quantity of one part bound to a technician, optionally for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartAllocation {
    pub id: AllocationId,
    pub part_id: PartId,
    pub service_id: Option<ServiceId>,
    pub technician_id: UserId,
    pub allocated_quantity: u32,
    pub allocated_by: UserId,
    pub status: AllocationStatus,
    pub allocation_notes: Option<String>,
    pub created_at: Timestamp,
    pub returned_at: Option<Timestamp>,
    pub return_notes: Option<String>,
}

impl PartAllocation {
    /// Create a fresh `allocated` entry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveQuantity`] when `quantity` is zero.
    pub fn new(
        part_id: PartId,
        technician_id: UserId,
        quantity: u32,
        allocated_by: UserId,
        created_at: Timestamp,
    ) -> Result<Self, RepairDeskError> {
        if quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity.into());
        }
        Ok(Self {
            id: AllocationId::new(),
            part_id,
            service_id: None,
            technician_id,
            allocated_quantity: quantity,
            allocated_by,
            status: AllocationStatus::Allocated,
            allocation_notes: None,
            created_at,
            returned_at: None,
            return_notes: None,
        })
    }

    #[must_use]
    pub fn with_service(mut self, service_id: Option<ServiceId>) -> Self {
        self.service_id = service_id;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.allocation_notes = notes;
        self
    }

    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.status == AllocationStatus::Allocated
    }

    /// Flip to `returned`.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyReturnedError`] if this allocation was already returned;
    /// the record is left unchanged.
    pub fn mark_returned(
        &mut self,
        at: Timestamp,
        notes: Option<String>,
    ) -> Result<(), AlreadyReturnedError> {
        if !self.is_outstanding() {
            return Err(AlreadyReturnedError {
                entity: "PartAllocation",
                id: self.id.to_string(),
            });
        }
        self.status = AllocationStatus::Returned;
        self.returned_at = Some(at);
        self.return_notes = notes;
        Ok(())
    }
}

/// Filter for listing allocations. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationQuery {
    pub part_id: Option<PartId>,
    pub technician_id: Option<UserId>,
    pub service_id: Option<ServiceId>,
    pub status: Option<AllocationStatus>,
}

impl AllocationQuery {
    #[must_use]
    pub fn matches(&self, allocation: &PartAllocation) -> bool {
        self.part_id.is_none_or(|id| id == allocation.part_id)
            && self
                .technician_id
                .is_none_or(|id| id == allocation.technician_id)
            && self
                .service_id
                .is_none_or(|id| Some(id) == allocation.service_id)
            && self.status.is_none_or(|status| status == allocation.status)
    }
}
