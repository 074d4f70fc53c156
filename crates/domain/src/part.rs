//! Available parts: the spare-part stock table.
//!
//! `quantity` is what is physically on the shelf. It only moves through the
//! allocation ledger (allocate / return / adjust), never by direct assignment
//! from outside the store.

use serde::{Deserialize, Serialize};

use crate::error::{RepairDeskError, ValidationError};
use crate::id::{PartId, UserId};
use crate::time::Timestamp;

/// A stock-keeping unit of spare parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePart {
    pub id: PartId,
    pub part_name: String,
    pub part_number: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: u32,
    pub location: Option<String>,
    pub added_by: UserId,
    pub created_at: Timestamp,
}

impl AvailablePart {
    /// Create a builder for constructing an [`AvailablePart`].
    #[must_use]
    pub fn builder() -> AvailablePartBuilder {
        AvailablePartBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] when `part_name` is empty.
    pub fn validate(&self) -> Result<(), RepairDeskError> {
        if self.part_name.trim().is_empty() {
            return Err(ValidationError::EmptyPartName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`AvailablePart`].
#[derive(Debug, Default)]
pub struct AvailablePartBuilder {
    id: Option<PartId>,
    part_name: Option<String>,
    part_number: Option<String>,
    category: Option<String>,
    manufacturer: Option<String>,
    quantity: u32,
    location: Option<String>,
    added_by: Option<UserId>,
    created_at: Option<Timestamp>,
}

impl AvailablePartBuilder {
    #[must_use]
    pub fn id(mut self, id: PartId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn part_name(mut self, name: impl Into<String>) -> Self {
        self.part_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn part_number(mut self, number: impl Into<String>) -> Self {
        self.part_number = Some(number.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn added_by(mut self, user: UserId) -> Self {
        self.added_by = Some(user);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`AvailablePart`].
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] if the name is empty or
    /// `added_by` is missing.
    pub fn build(self) -> Result<AvailablePart, RepairDeskError> {
        let added_by = self
            .added_by
            .ok_or(ValidationError::MissingField("added_by"))?;
        let part = AvailablePart {
            id: self.id.unwrap_or_default(),
            part_name: self.part_name.unwrap_or_default(),
            part_number: self.part_number,
            category: self.category,
            manufacturer: self.manufacturer,
            quantity: self.quantity,
            location: self.location,
            added_by,
            created_at: self.created_at.unwrap_or_else(crate::time::now),
        };
        part.validate()?;
        Ok(part)
    }
}

/// Search criteria for the parts catalogue.
///
/// Every criterion that is set must match (case-insensitive substring).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
}

impl PartQuery {
    #[must_use]
    pub fn matches(&self, part: &AvailablePart) -> bool {
        fn contains(haystack: Option<&str>, needle: Option<&str>) -> bool {
            match needle {
                None => true,
                Some(needle) => haystack
                    .is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())),
            }
        }
        contains(Some(&part.part_name), self.name.as_deref())
            && contains(part.category.as_deref(), self.category.as_deref())
            && contains(part.manufacturer.as_deref(), self.manufacturer.as_deref())
    }
}

/// Outcome of a conditional stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The change was applied.
    Applied { before: u32, after: u32 },
    /// The change would have driven stock below zero or past `u32::MAX`;
    /// nothing was written.
    Insufficient { available: u32 },
}

/// Where a part's units are, in aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    pub part_id: PartId,
    /// Units on the shelf.
    pub in_stock: u64,
    /// Units out with technicians (`allocated` status only).
    pub allocated: u64,
    /// Units ever received, net of manual adjustments.
    pub received: i64,
}

impl StockBalance {
    /// Whether nothing has been created or destroyed by allocation and return.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        i64::try_from(self.in_stock + self.allocated).is_ok_and(|total| total == self.received)
    }
}
