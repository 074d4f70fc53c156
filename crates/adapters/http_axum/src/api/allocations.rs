//! JSON REST handlers for the allocation ledger.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use repairdesk_app::services::allocation_coordinator::{
    AllocationOutcome, AllocationRequest, ReturnOutcome,
};
use repairdesk_domain::allocation::{AllocationQuery, PartAllocation};
use repairdesk_domain::id::{AllocationId, PartId, ServiceId, UserId};
use repairdesk_domain::time::Timestamp;

use super::parse_id;
use crate::actor::Actor;
use crate::error::ApiError;
use crate::state::{AppState, Ports};

/// Request body for handing parts to a technician.
#[derive(Deserialize)]
pub struct AllocateRequest {
    pub part_id: PartId,
    pub technician_id: UserId,
    pub quantity: u32,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for bringing allocated parts back.
#[derive(Deserialize, Default)]
pub struct ReturnRequest {
    #[serde(default)]
    pub returned_at: Option<Timestamp>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of a successful allocation.
#[derive(Serialize)]
pub struct AllocatedBody {
    pub allocation: PartAllocation,
    pub remaining_quantity: u32,
}

impl From<AllocationOutcome> for AllocatedBody {
    fn from(outcome: AllocationOutcome) -> Self {
        Self {
            allocation: outcome.allocation,
            remaining_quantity: outcome.remaining_quantity,
        }
    }
}

/// Body of a successful return.
#[derive(Serialize)]
pub struct ReturnedBody {
    pub allocation: PartAllocation,
    pub part_quantity: u32,
}

impl From<ReturnOutcome> for ReturnedBody {
    fn from(outcome: ReturnOutcome) -> Self {
        Self {
            allocation: outcome.allocation,
            part_quantity: outcome.part_quantity,
        }
    }
}

/// Possible responses from the allocate endpoint.
pub enum AllocateResponse {
    Created(Json<AllocatedBody>),
}

impl IntoResponse for AllocateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/allocations?part_id=&technician_id=&service_id=&status=`
pub async fn list<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Query(query): Query<AllocationQuery>,
) -> Result<Json<Vec<PartAllocation>>, ApiError> {
    let allocations = state.coordinator.list_allocations(actor, query).await?;
    Ok(Json(allocations))
}

/// `POST /api/allocations`
pub async fn allocate<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Json(req): Json<AllocateRequest>,
) -> Result<AllocateResponse, ApiError> {
    let outcome = state
        .coordinator
        .allocate(
            actor,
            AllocationRequest {
                part_id: req.part_id,
                technician_id: req.technician_id,
                quantity: req.quantity,
                service_id: req.service_id,
                notes: req.notes,
            },
        )
        .await?;
    Ok(AllocateResponse::Created(Json(outcome.into())))
}

/// `POST /api/allocations/:id/return`
pub async fn mark_returned<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<ReturnedBody>, ApiError> {
    let id: AllocationId = parse_id(&id)?;
    let outcome = state
        .coordinator
        .mark_returned(actor, id, req.returned_at, req.notes)
        .await?;
    Ok(Json(outcome.into()))
}
