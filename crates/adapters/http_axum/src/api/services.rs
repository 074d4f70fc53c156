//! JSON REST handlers for services and removed parts.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use repairdesk_app::services::service_lifecycle::{NewService, RemovedPartInput};
use repairdesk_domain::id::{ApplianceId, ClientId, RemovedPartId, ServiceId};
use repairdesk_domain::removed_part::RemovedPart;
use repairdesk_domain::service::{Service, ServiceTransition, StatusChange, WarrantyStatus};
use repairdesk_domain::time::Timestamp;

use super::parse_id;
use crate::actor::Actor;
use crate::error::ApiError;
use crate::state::{AppState, Ports};

/// Request body for opening a service.
#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub client_id: ClientId,
    pub appliance_id: ApplianceId,
    pub description: String,
    #[serde(default)]
    pub warranty_status: WarrantyStatus,
}

/// Request body for recording a part taken out of an appliance.
#[derive(Deserialize)]
pub struct RemovedPartRequest {
    pub part_name: String,
    #[serde(default)]
    pub removal_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for a missed visit.
#[derive(Deserialize, Default)]
pub struct ClientNotAvailableRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for returning a removed part.
#[derive(Deserialize, Default)]
pub struct ReturnRemovedPartRequest {
    #[serde(default)]
    pub return_date: Option<Timestamp>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Possible responses from endpoints returning a single service.
pub enum ServiceResponse {
    Ok(Json<Service>),
    Created(Json<Service>),
}

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Service>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the history endpoint.
pub enum HistoryResponse {
    Ok(Json<Vec<StatusChange>>),
}

impl IntoResponse for HistoryResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the removed-part endpoints.
pub enum RemovedPartResponse {
    Ok(Json<RemovedPart>),
    Created(Json<RemovedPart>),
}

impl IntoResponse for RemovedPartResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `GET /api/services`
pub async fn list<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
) -> Result<ListResponse, ApiError> {
    let services = state.lifecycle.list_services(actor).await?;
    Ok(ListResponse::Ok(Json(services)))
}

/// `POST /api/services`
pub async fn create<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Json(req): Json<CreateServiceRequest>,
) -> Result<ServiceResponse, ApiError> {
    let service = state
        .lifecycle
        .create_service(
            actor,
            NewService {
                client_id: req.client_id,
                appliance_id: req.appliance_id,
                description: req.description,
                warranty_status: req.warranty_status,
            },
        )
        .await?;
    Ok(ServiceResponse::Created(Json(service)))
}

/// `GET /api/services/:id`
pub async fn get<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<ServiceResponse, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let service = state.lifecycle.get_service(actor, id).await?;
    Ok(ServiceResponse::Ok(Json(service)))
}

/// `GET /api/services/:id/history`
pub async fn history<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<HistoryResponse, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let history = state.lifecycle.history(actor, id).await?;
    Ok(HistoryResponse::Ok(Json(history)))
}

/// `POST /api/services/:id/transitions`
///
/// The body names the operation and carries its parameters, e.g.
/// `{"operation": "assign_technician", "technician_id": "..."}`.
pub async fn transition<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(transition): Json<ServiceTransition>,
) -> Result<ServiceResponse, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let service = state.lifecycle.transition(actor, id, transition).await?;
    Ok(ServiceResponse::Ok(Json(service)))
}

/// `POST /api/services/:id/removed-parts`
pub async fn record_removed_part<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<RemovedPartRequest>,
) -> Result<RemovedPartResponse, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let part = state
        .lifecycle
        .record_removed_part(
            actor,
            id,
            RemovedPartInput {
                part_name: req.part_name,
                removal_reason: req.removal_reason,
                notes: req.notes,
            },
        )
        .await?;
    Ok(RemovedPartResponse::Created(Json(part)))
}

/// `POST /api/services/:id/client-not-available`
pub async fn client_not_available<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<ClientNotAvailableRequest>,
) -> Result<ServiceResponse, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let service = state
        .lifecycle
        .report_client_not_available(actor, id, req.notes)
        .await?;
    Ok(ServiceResponse::Ok(Json(service)))
}

/// `POST /api/removed-parts/:id/return`
pub async fn return_removed_part<P: Ports>(
    State(state): State<AppState<P>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<ReturnRemovedPartRequest>,
) -> Result<RemovedPartResponse, ApiError> {
    let id: RemovedPartId = parse_id(&id)?;
    let part = state
        .lifecycle
        .mark_removed_part_returned(actor, id, req.return_date, req.notes)
        .await?;
    Ok(RemovedPartResponse::Ok(Json(part)))
}
