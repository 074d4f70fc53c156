//! Service: one repair job tracked from intake to completion.
//!
//! The lifecycle is a closed state machine. [`TransitionKind::allowed_from`]
//! and [`TransitionKind::target`] are the only place the transition table
//! lives; everything else (the application service, the HTTP adapter, history
//! replay) asks them.
//!
//! ```text
//! pending ─► assigned ─► scheduled ─► in_progress ─┬─► waiting_parts ────────┐
//!               │                        ▲         ├─► device_parts_removed ─┤
//!               └────────────────────────┘         └─────────────────────────┴─► completed
//!
//! any non-terminal state ─► canceled
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransitionError, RepairDeskError, ValidationError};
use crate::id::{ApplianceId, ClientId, ServiceId, StatusChangeId, UserId};
use crate::time::Timestamp;

/// Lifecycle status of a [`Service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Pending,
    Assigned,
    Scheduled,
    InProgress,
    WaitingParts,
    DevicePartsRemoved,
    Completed,
    Canceled,
}

impl ServiceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::WaitingParts => "waiting_parts",
            Self::DevicePartsRemoved => "device_parts_removed",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// `completed` and `canceled` accept no further transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Reconstruct the current status by replaying a service's history from
    /// `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the entries are out of sequence or any
    /// step is not allowed by the transition table.
    pub fn replay<'a, I>(changes: I) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = &'a StatusChange>,
    {
        let mut current = Self::Pending;
        for (index, change) in changes.into_iter().enumerate() {
            let expected = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if change.sequence != expected {
                return Err(HistoryError::OutOfSequence {
                    expected,
                    found: change.sequence,
                });
            }
            if change.from != current {
                return Err(HistoryError::Discontinuous {
                    sequence: change.sequence,
                    expected: current,
                    found: change.from,
                });
            }
            if !change.operation.allowed_from().contains(&current)
                || change.operation.target() != change.to
            {
                return Err(HistoryError::IllegalStep {
                    sequence: change.sequence,
                    operation: change.operation,
                });
            }
            current = change.to;
        }
        Ok(current)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// Warranty coverage recorded at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    InWarranty,
    #[default]
    OutOfWarranty,
}

impl WarrantyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InWarranty => "in_warranty",
            Self::OutOfWarranty => "out_of_warranty",
        }
    }
}

/// The name of a guarded lifecycle operation, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    AssignTechnician,
    Schedule,
    StartWork,
    RequestParts,
    MarkPartsRemoved,
    Complete,
    Cancel,
}

impl TransitionKind {
    pub const ALL: [Self; 7] = [
        Self::AssignTechnician,
        Self::Schedule,
        Self::StartWork,
        Self::RequestParts,
        Self::MarkPartsRemoved,
        Self::Complete,
        Self::Cancel,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssignTechnician => "assign_technician",
            Self::Schedule => "schedule",
            Self::StartWork => "start_work",
            Self::RequestParts => "request_parts",
            Self::MarkPartsRemoved => "mark_parts_removed",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    /// States this operation may be applied from.
    #[must_use]
    pub fn allowed_from(self) -> &'static [ServiceStatus] {
        use ServiceStatus::{
            Assigned, DevicePartsRemoved, InProgress, Pending, Scheduled, WaitingParts,
        };
        match self {
            Self::AssignTechnician => &[Pending],
            Self::Schedule => &[Assigned],
            Self::StartWork => &[Scheduled, Assigned],
            Self::RequestParts | Self::MarkPartsRemoved => &[InProgress],
            Self::Complete => &[InProgress, WaitingParts, DevicePartsRemoved],
            Self::Cancel => &[
                Pending,
                Assigned,
                Scheduled,
                InProgress,
                WaitingParts,
                DevicePartsRemoved,
            ],
        }
    }

    /// State the service ends up in after this operation.
    #[must_use]
    pub fn target(self) -> ServiceStatus {
        match self {
            Self::AssignTechnician => ServiceStatus::Assigned,
            Self::Schedule => ServiceStatus::Scheduled,
            Self::StartWork => ServiceStatus::InProgress,
            Self::RequestParts => ServiceStatus::WaitingParts,
            Self::MarkPartsRemoved => ServiceStatus::DevicePartsRemoved,
            Self::Complete => ServiceStatus::Completed,
            Self::Cancel => ServiceStatus::Canceled,
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransitionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownOperation(s.to_string()))
    }
}

/// A lifecycle operation together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ServiceTransition {
    AssignTechnician {
        technician_id: UserId,
    },
    Schedule {
        date: Timestamp,
    },
    StartWork,
    RequestParts {
        #[serde(default)]
        notes: Option<String>,
    },
    MarkPartsRemoved,
    Complete {
        #[serde(default)]
        notes: Option<String>,
        /// Final cost in minor currency units.
        #[serde(default)]
        cost: Option<i64>,
        #[serde(default)]
        is_completely_fixed: Option<bool>,
    },
    Cancel {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl ServiceTransition {
    #[must_use]
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::AssignTechnician { .. } => TransitionKind::AssignTechnician,
            Self::Schedule { .. } => TransitionKind::Schedule,
            Self::StartWork => TransitionKind::StartWork,
            Self::RequestParts { .. } => TransitionKind::RequestParts,
            Self::MarkPartsRemoved => TransitionKind::MarkPartsRemoved,
            Self::Complete { .. } => TransitionKind::Complete,
            Self::Cancel { .. } => TransitionKind::Cancel,
        }
    }

    /// Free-text notes recorded in the history entry.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::RequestParts { notes } | Self::Complete { notes, .. } => notes.as_deref(),
            Self::Cancel { reason } => reason.as_deref(),
            _ => None,
        }
    }

    /// Check parameters that do not depend on stored state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeCost`] for a negative completion cost.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::Complete {
            cost: Some(cost), ..
        } = self
            && *cost < 0
        {
            return Err(ValidationError::NegativeCost);
        }
        Ok(())
    }
}

/// One entry of a service's status history.
///
/// History is produced only by [`Service::apply`] and never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: StatusChangeId,
    pub service_id: ServiceId,
    /// 1-based position in the service's history.
    pub sequence: u32,
    pub operation: TransitionKind,
    pub from: ServiceStatus,
    pub to: ServiceStatus,
    pub actor: UserId,
    pub at: Timestamp,
    pub notes: Option<String>,
}

/// A replayed history that does not form a legal chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("expected sequence {expected}, found {found}")]
    OutOfSequence { expected: u32, found: u32 },

    #[error("entry {sequence} starts from {found} but the service was {expected}")]
    Discontinuous {
        sequence: u32,
        expected: ServiceStatus,
        found: ServiceStatus,
    },

    #[error("entry {sequence} applies {operation} illegally")]
    IllegalStep {
        sequence: u32,
        operation: TransitionKind,
    },
}

/// A repair job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub client_id: ClientId,
    pub appliance_id: ApplianceId,
    pub technician_id: Option<UserId>,
    pub business_partner_id: Option<UserId>,
    pub created_by: UserId,
    pub status: ServiceStatus,
    pub warranty_status: WarrantyStatus,
    pub description: String,
    pub technician_notes: Option<String>,
    pub used_parts: Vec<String>,
    /// Final cost in minor currency units.
    pub cost: Option<i64>,
    pub is_completely_fixed: Option<bool>,
    pub scheduled_date: Option<Timestamp>,
    pub completed_date: Option<Timestamp>,
    pub client_not_available_count: u32,
    /// Number of transitions applied so far; doubles as the optimistic
    /// concurrency token for stores.
    pub revision: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Service {
    /// Create a builder for constructing a [`Service`].
    #[must_use]
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] when `description` is empty.
    pub fn validate(&self) -> Result<(), RepairDeskError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription.into());
        }
        Ok(())
    }

    /// Apply a guarded transition, returning the history entry it produced.
    ///
    /// On error the service is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError::WrongStatus`] when the current status
    /// is not a valid predecessor for the operation.
    pub fn apply(
        &mut self,
        transition: &ServiceTransition,
        actor: UserId,
        at: Timestamp,
    ) -> Result<StatusChange, InvalidTransitionError> {
        let kind = transition.kind();
        if !kind.allowed_from().contains(&self.status) {
            return Err(InvalidTransitionError::WrongStatus {
                operation: kind.as_str(),
                from: self.status,
            });
        }

        match transition {
            ServiceTransition::AssignTechnician { technician_id } => {
                self.technician_id = Some(*technician_id);
            }
            ServiceTransition::Schedule { date } => {
                self.scheduled_date = Some(*date);
            }
            ServiceTransition::Complete {
                notes,
                cost,
                is_completely_fixed,
            } => {
                if let Some(notes) = notes {
                    self.technician_notes = Some(notes.clone());
                }
                if cost.is_some() {
                    self.cost = *cost;
                }
                self.is_completely_fixed = *is_completely_fixed;
                self.completed_date = Some(at);
            }
            ServiceTransition::StartWork
            | ServiceTransition::RequestParts { .. }
            | ServiceTransition::MarkPartsRemoved
            | ServiceTransition::Cancel { .. } => {}
        }

        let from = self.status;
        self.status = kind.target();
        self.revision += 1;
        self.updated_at = at;

        Ok(StatusChange {
            id: StatusChangeId::new(),
            service_id: self.id,
            sequence: self.revision,
            operation: kind,
            from,
            to: self.status,
            actor,
            at,
            notes: transition.notes().map(str::to_string),
        })
    }

    /// Whether `user` is the technician currently assigned to this service.
    #[must_use]
    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.technician_id == Some(user)
    }

    /// Append a line to the technician notes.
    pub fn append_note(&mut self, note: &str, at: Timestamp) {
        self.technician_notes = Some(match self.technician_notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note.to_string(),
        });
        self.updated_at = at;
    }
}

/// Step-by-step builder for [`Service`].
#[derive(Debug, Default)]
pub struct ServiceBuilder {
    id: Option<ServiceId>,
    client_id: Option<ClientId>,
    appliance_id: Option<ApplianceId>,
    business_partner_id: Option<UserId>,
    created_by: Option<UserId>,
    warranty_status: WarrantyStatus,
    description: Option<String>,
    created_at: Option<Timestamp>,
}

impl ServiceBuilder {
    #[must_use]
    pub fn id(mut self, id: ServiceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn appliance_id(mut self, appliance_id: ApplianceId) -> Self {
        self.appliance_id = Some(appliance_id);
        self
    }

    #[must_use]
    pub fn business_partner_id(mut self, partner: UserId) -> Self {
        self.business_partner_id = Some(partner);
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    #[must_use]
    pub fn warranty_status(mut self, warranty_status: WarrantyStatus) -> Self {
        self.warranty_status = warranty_status;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a `pending` [`Service`].
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] if a reference is missing or
    /// the description is empty.
    pub fn build(self) -> Result<Service, RepairDeskError> {
        let client_id = self
            .client_id
            .ok_or(ValidationError::MissingField("client_id"))?;
        let appliance_id = self
            .appliance_id
            .ok_or(ValidationError::MissingField("appliance_id"))?;
        let created_by = self
            .created_by
            .ok_or(ValidationError::MissingField("created_by"))?;
        let created_at = self.created_at.unwrap_or_else(crate::time::now);

        let service = Service {
            id: self.id.unwrap_or_default(),
            client_id,
            appliance_id,
            technician_id: None,
            business_partner_id: self.business_partner_id,
            created_by,
            status: ServiceStatus::Pending,
            warranty_status: self.warranty_status,
            description: self.description.unwrap_or_default(),
            technician_notes: None,
            used_parts: Vec::new(),
            cost: None,
            is_completely_fixed: None,
            scheduled_date: None,
            completed_date: None,
            client_not_available_count: 0,
            revision: 0,
            created_at,
            updated_at: created_at,
        };
        service.validate()?;
        Ok(service)
    }
}
