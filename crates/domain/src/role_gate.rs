//! Role gate: the capability table deciding who may do what.
//!
//! [`rule`] is the whole policy: one row per `(role, operation)` pair.
//! Callers never compare roles themselves; they build an [`AccessContext`]
//! describing the record being touched and ask [`authorize`].

use crate::directory::{Role, User};
use crate::error::ForbiddenError;
use crate::id::UserId;
use crate::service::{Service, TransitionKind};

/// Every gated core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateService,
    ReadService,
    AssignTechnician,
    ScheduleService,
    StartWork,
    RequestParts,
    MarkPartsRemoved,
    CompleteService,
    CancelService,
    RecordRemovedPart,
    ReturnRemovedPart,
    ReportClientNotAvailable,
    ReceivePart,
    ReadInventory,
    AllocatePart,
    ReturnAllocation,
    AdjustStock,
    DeletePart,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateService => "create_service",
            Self::ReadService => "read_service",
            Self::AssignTechnician => "assign_technician",
            Self::ScheduleService => "schedule",
            Self::StartWork => "start_work",
            Self::RequestParts => "request_parts",
            Self::MarkPartsRemoved => "mark_parts_removed",
            Self::CompleteService => "complete",
            Self::CancelService => "cancel",
            Self::RecordRemovedPart => "record_removed_part",
            Self::ReturnRemovedPart => "return_removed_part",
            Self::ReportClientNotAvailable => "report_client_not_available",
            Self::ReceivePart => "receive_part",
            Self::ReadInventory => "read_inventory",
            Self::AllocatePart => "allocate_part",
            Self::ReturnAllocation => "return_allocation",
            Self::AdjustStock => "adjust_stock",
            Self::DeletePart => "delete_part",
        }
    }
}

impl From<TransitionKind> for Operation {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::AssignTechnician => Self::AssignTechnician,
            TransitionKind::Schedule => Self::ScheduleService,
            TransitionKind::StartWork => Self::StartWork,
            TransitionKind::RequestParts => Self::RequestParts,
            TransitionKind::MarkPartsRemoved => Self::MarkPartsRemoved,
            TransitionKind::Complete => Self::CompleteService,
            TransitionKind::Cancel => Self::CancelService,
        }
    }
}

/// Ownership facts about the record an operation touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// Technician assigned to the service, if any.
    pub assigned_technician: Option<UserId>,
    /// Partner that created the service, if any.
    pub business_partner: Option<UserId>,
    /// Technician receiving or holding stock, for ledger operations.
    pub stock_holder: Option<UserId>,
}

impl AccessContext {
    /// No record-level facts (creation, catalogue reads).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_service(service: &Service) -> Self {
        Self {
            assigned_technician: service.technician_id,
            business_partner: service.business_partner_id,
            stock_holder: None,
        }
    }

    #[must_use]
    pub fn for_stock_holder(technician: UserId) -> Self {
        Self {
            stock_holder: Some(technician),
            ..Self::default()
        }
    }
}

/// How a `(role, operation)` pair is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Allow,
    Deny,
    /// Only the technician assigned to the service.
    AssignedTechnician,
    /// Only the partner that created the service.
    OwningPartner,
    /// Only when the actor is the technician the stock moves to or from.
    OwnStock,
}

/// The capability table.
#[must_use]
pub fn rule(role: Role, operation: Operation) -> Rule {
    use Operation as Op;
    match (role, operation) {
        (Role::Admin, _) => Rule::Allow,

        (Role::Technician, Op::ReadInventory) => Rule::Allow,
        (
            Role::Technician,
            Op::ReadService
            | Op::ScheduleService
            | Op::StartWork
            | Op::RequestParts
            | Op::MarkPartsRemoved
            | Op::CompleteService
            | Op::RecordRemovedPart
            | Op::ReturnRemovedPart
            | Op::ReportClientNotAvailable,
        ) => Rule::AssignedTechnician,
        (Role::Technician, Op::AllocatePart | Op::ReturnAllocation) => Rule::OwnStock,

        (Role::BusinessPartner | Role::Customer, Op::CreateService) => Rule::Allow,
        (Role::BusinessPartner, Op::ReadService) => Rule::OwningPartner,

        _ => Rule::Deny,
    }
}

/// Whether `actor` may perform `operation` on the record described by `ctx`.
///
/// Inactive users are denied everything.
#[must_use]
pub fn allowed(actor: &User, operation: Operation, ctx: &AccessContext) -> bool {
    if !actor.active {
        return false;
    }
    match rule(actor.role, operation) {
        Rule::Allow => true,
        Rule::Deny => false,
        Rule::AssignedTechnician => ctx.assigned_technician == Some(actor.id),
        Rule::OwningPartner => ctx.business_partner == Some(actor.id),
        Rule::OwnStock => ctx.stock_holder == Some(actor.id),
    }
}

/// [`allowed`], as a typed failure.
///
/// # Errors
///
/// Returns [`ForbiddenError`] when the gate denies the actor.
pub fn authorize(
    actor: &User,
    operation: Operation,
    ctx: &AccessContext,
) -> Result<(), ForbiddenError> {
    if allowed(actor, operation, ctx) {
        Ok(())
    } else {
        Err(ForbiddenError {
            actor: actor.id.to_string(),
            operation: operation.as_str(),
        })
    }
}
