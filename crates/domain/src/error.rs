//! Common error types used across the workspace.
//!
//! Each failure kind is its own small typed error, and [`RepairDeskError`]
//! is the umbrella every port and use-case returns. Adapters convert their
//! own errors into [`RepairDeskError::Storage`].

use crate::service::ServiceStatus;

/// Top-level error returned by every core operation.
#[derive(Debug, thiserror::Error)]
pub enum RepairDeskError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("forbidden")]
    Forbidden(#[from] ForbiddenError),

    #[error("invalid transition")]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error("insufficient stock")]
    InsufficientStock(#[from] InsufficientStockError),

    #[error("already returned")]
    AlreadyReturned(#[from] AlreadyReturnedError),

    #[error("part in use")]
    PartInUse(#[from] PartInUseError),

    #[error("conflict")]
    Conflict(#[from] ConflictError),

    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Malformed input rejected before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("part name must not be empty")]
    EmptyPartName,

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("adjustment delta must not be zero")]
    ZeroAdjustment,

    #[error("cost must not be negative")]
    NegativeCost,

    #[error("user {0} is not an active technician")]
    NotATechnician(String),

    #[error("appliance {appliance} does not belong to client {client}")]
    ApplianceClientMismatch { appliance: String, client: String },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

/// A referenced record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// The role gate denied the actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("actor {actor} may not {operation}")]
pub struct ForbiddenError {
    pub actor: String,
    pub operation: &'static str,
}

/// The lifecycle guard rejected a transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransitionError {
    #[error("cannot {operation} a service in status {from}")]
    WrongStatus {
        operation: &'static str,
        from: ServiceStatus,
    },

    #[error("cannot {operation} before any removed part is recorded")]
    NoRemovedParts { operation: &'static str },

    #[error("service changed concurrently (expected revision {expected})")]
    Stale { expected: u32 },
}

/// An allocation or adjustment would drive stock below zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("part {part} has {available} in stock, {requested} requested")]
pub struct InsufficientStockError {
    pub part: String,
    pub available: u32,
    pub requested: u64,
}

/// A return was attempted on something that is already back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} is already returned")]
pub struct AlreadyReturnedError {
    pub entity: &'static str,
    pub id: String,
}

/// The part still has outstanding allocations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("part {part} has {outstanding} outstanding allocation(s)")]
pub struct PartInUseError {
    pub part: String,
    pub outstanding: u64,
}

/// A request collided with existing state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("request limit of {limit} per {window_hours}h reached")]
    RateLimited { limit: u32, window_hours: i64 },

    #[error("part {part} cannot take {credited} more units on top of {available}")]
    StockOverflow {
        part: String,
        available: u32,
        credited: u32,
    },
}
