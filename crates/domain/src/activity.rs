//! Activity log: append-only audit trail of every stock movement.

use serde::{Deserialize, Serialize};

use crate::id::{ActivityId, AllocationId, PartId, UserId};
use crate::time::Timestamp;

/// What moved the stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Received,
    Allocated,
    Returned,
    Adjusted,
    Deleted,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Allocated => "allocated",
            Self::Returned => "returned",
            Self::Adjusted => "adjusted",
            Self::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "allocated" => Ok(Self::Allocated),
            "returned" => Ok(Self::Returned),
            "adjusted" => Ok(Self::Adjusted),
            "deleted" => Ok(Self::Deleted),
            other => Err(crate::error::ValidationError::UnknownStatus(
                other.to_string(),
            )),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub part_id: PartId,
    pub allocation_id: Option<AllocationId>,
    pub kind: ActivityKind,
    pub actor: UserId,
    pub quantity_before: u32,
    pub quantity_after: u32,
    pub notes: Option<String>,
    pub recorded_at: Timestamp,
}

impl ActivityLogEntry {
    #[must_use]
    pub fn new(
        part_id: PartId,
        kind: ActivityKind,
        actor: UserId,
        quantity_before: u32,
        quantity_after: u32,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            part_id,
            allocation_id: None,
            kind,
            actor,
            quantity_before,
            quantity_after,
            notes: None,
            recorded_at,
        }
    }

    #[must_use]
    pub fn with_allocation(mut self, allocation_id: AllocationId) -> Self {
        self.allocation_id = Some(allocation_id);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Signed change in shelf quantity.
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(self.quantity_after) - i64::from(self.quantity_before)
    }

    /// Contribution to the "total ever received" figure.
    ///
    /// Allocations and returns only move units; receipts, manual adjustments,
    /// and deletions change how many units the business holds.
    #[must_use]
    pub fn received_delta(&self) -> i64 {
        match self.kind {
            ActivityKind::Received | ActivityKind::Adjusted | ActivityKind::Deleted => {
                self.delta()
            }
            ActivityKind::Allocated | ActivityKind::Returned => 0,
        }
    }
}
