//! Removed parts: components taken out of a client's appliance during repair.
//!
//! Unlike allocations these never touch the stock table: the part belongs to
//! the client and either goes back into the appliance or is disposed of.

use serde::{Deserialize, Serialize};

use crate::error::{AlreadyReturnedError, RepairDeskError, ValidationError};
use crate::id::{RemovedPartId, ServiceId, UserId};
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedPart {
    pub id: RemovedPartId,
    pub service_id: ServiceId,
    pub technician_id: UserId,
    pub part_name: String,
    pub removal_reason: Option<String>,
    pub removed_at: Timestamp,
    pub return_date: Option<Timestamp>,
    pub notes: Option<String>,
}

impl RemovedPart {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPartName`] when `part_name` is blank.
    pub fn new(
        service_id: ServiceId,
        technician_id: UserId,
        part_name: impl Into<String>,
        removed_at: Timestamp,
    ) -> Result<Self, RepairDeskError> {
        let part_name = part_name.into();
        if part_name.trim().is_empty() {
            return Err(ValidationError::EmptyPartName.into());
        }
        Ok(Self {
            id: RemovedPartId::new(),
            service_id,
            technician_id,
            part_name,
            removal_reason: None,
            removed_at,
            return_date: None,
            notes: None,
        })
    }

    #[must_use]
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    /// Record that the part went back into the appliance.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyReturnedError`] if a return date is already set.
    pub fn mark_returned(
        &mut self,
        return_date: Timestamp,
        notes: Option<String>,
    ) -> Result<(), AlreadyReturnedError> {
        if self.is_returned() {
            return Err(AlreadyReturnedError {
                entity: "RemovedPart",
                id: self.id.to_string(),
            });
        }
        self.return_date = Some(return_date);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn should_reject_blank_part_name() {
        let result = RemovedPart::new(ServiceId::new(), UserId::new(), "", now());
        assert!(matches!(
            result,
            Err(RepairDeskError::Validation(ValidationError::EmptyPartName))
        ));
    }

    #[test]
    fn should_mark_returned_only_once() {
        let mut part = RemovedPart::new(ServiceId::new(), UserId::new(), "Motor", now()).unwrap();
        assert!(!part.is_returned());

        part.mark_returned(now(), Some("reinstalled".to_string()))
            .unwrap();
        assert!(part.is_returned());
        assert_eq!(part.notes.as_deref(), Some("reinstalled"));

        assert!(part.mark_returned(now(), None).is_err());
    }
}
