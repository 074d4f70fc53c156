//! JSON REST handlers for the parts catalogue.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use repairdesk_app::services::parts_inventory::NewPart;
use repairdesk_domain::activity::ActivityLogEntry;
use repairdesk_domain::id::PartId;
use repairdesk_domain::part::{AvailablePart, PartQuery, StockBalance};

use super::parse_id;
use crate::actor::Actor;
use crate::error::ApiError;
use crate::state::{AppState, Ports};

/// Request body for receiving a new part into stock.
#[derive(Deserialize)]
pub struct ReceivePartRequest {
    pub part_name: String,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<ReceivePartRequest> for NewPart {
    fn from(req: ReceivePartRequest) -> Self {
        Self {
            part_name: req.part_name,
            part_number: req.part_number,
            category: req.category,
            manufacturer: req.manufacturer,
            quantity: req.quantity,
            location: req.location,
        }
    }
}

/// Request body for a manual stock correction.
#[derive(Deserialize)]
pub struct AdjustRequest {
    pub delta: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<AvailablePart>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from endpoints returning a single part.
pub enum PartResponse {
    Ok(Json<AvailablePart>),
    Created(Json<AvailablePart>),
}

impl IntoResponse for PartResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/parts?name=&category=&manufacturer=`
pub async fn list<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Query(query): Query<PartQuery>,
) -> Result<ListResponse, ApiError> {
    let parts = if query == PartQuery::default() {
        state.inventory.list_parts(actor).await?
    } else {
        state.inventory.search_parts(actor, &query).await?
    };
    Ok(ListResponse::Ok(Json(parts)))
}

/// `POST /api/parts`
pub async fn receive<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Json(req): Json<ReceivePartRequest>,
) -> Result<PartResponse, ApiError> {
    let part = state.inventory.receive_part(actor, req.into()).await?;
    Ok(PartResponse::Created(Json(part)))
}

/// `GET /api/parts/:id`
pub async fn get<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<PartResponse, ApiError> {
    let id: PartId = parse_id(&id)?;
    let part = state.inventory.get_part(actor, id).await?;
    Ok(PartResponse::Ok(Json(part)))
}

/// `DELETE /api/parts/:id`
pub async fn delete<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError> {
    let id: PartId = parse_id(&id)?;
    state.coordinator.delete_part(actor, id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/parts/:id/adjust`
pub async fn adjust<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<AdjustRequest>,
) -> Result<PartResponse, ApiError> {
    let id: PartId = parse_id(&id)?;
    let part = state
        .coordinator
        .adjust_quantity(actor, id, req.delta, req.notes)
        .await?;
    Ok(PartResponse::Ok(Json(part)))
}

/// `GET /api/parts/:id/balance`
pub async fn balance<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<StockBalance>, ApiError> {
    let id: PartId = parse_id(&id)?;
    Ok(Json(state.inventory.balance(actor, id).await?))
}

/// `GET /api/parts/:id/activity`
pub async fn activity<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Vec<ActivityLogEntry>>, ApiError> {
    let id: PartId = parse_id(&id)?;
    Ok(Json(state.inventory.activity(actor, id).await?))
}
