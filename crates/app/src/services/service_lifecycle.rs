//! Service lifecycle: intake, guarded transitions, and field reports.
//!
//! All status changes funnel through [`ServiceLifecycle::transition`]: the
//! role gate is consulted, [`Service::apply`] enforces the transition table,
//! and the repository persists the new snapshot together with its history
//! entry. Nothing is written when any of those steps fails.

use repairdesk_domain::directory::Role;
use repairdesk_domain::error::{
    AlreadyReturnedError, ConflictError, ForbiddenError, InvalidTransitionError, NotFoundError,
    RepairDeskError, ValidationError,
};
use repairdesk_domain::id::{ApplianceId, ClientId, RemovedPartId, ServiceId, UserId};
use repairdesk_domain::notification::{Notification, NotificationKind};
use repairdesk_domain::removed_part::RemovedPart;
use repairdesk_domain::request::{RequestKind, RequestWindow};
use repairdesk_domain::role_gate::{self, AccessContext, Operation};
use repairdesk_domain::service::{
    Service, ServiceStatus, ServiceTransition, StatusChange, TransitionKind, WarrantyStatus,
};
use repairdesk_domain::time::{Timestamp, now};

use crate::notifications::dispatch_best_effort;
use crate::ports::{
    Directory, NotificationDispatcher, RemovedPartRepository, RequestTracker, ServiceRepository,
};
use crate::services::{authorize_actor, resolve_actor};

/// Intake data for a new service.
#[derive(Debug, Clone)]
pub struct NewService {
    pub client_id: ClientId,
    pub appliance_id: ApplianceId,
    pub description: String,
    pub warranty_status: WarrantyStatus,
}

/// A part a technician took out of the client's appliance.
#[derive(Debug, Clone, Default)]
pub struct RemovedPartInput {
    pub part_name: String,
    pub removal_reason: Option<String>,
    pub notes: Option<String>,
}

/// Statuses during which a visit can find the client absent.
const VISIT_STATUSES: [ServiceStatus; 3] = [
    ServiceStatus::Assigned,
    ServiceStatus::Scheduled,
    ServiceStatus::InProgress,
];

/// Statuses during which removed parts can be recorded.
const REMOVAL_STATUSES: [ServiceStatus; 2] =
    [ServiceStatus::InProgress, ServiceStatus::DevicePartsRemoved];

/// Application service driving the service state machine.
pub struct ServiceLifecycle<S, R, D, T, N> {
    services: S,
    removed_parts: R,
    directory: D,
    requests: T,
    notifier: N,
    request_window: RequestWindow,
}

impl<S, R, D, T, N> ServiceLifecycle<S, R, D, T, N>
where
    S: ServiceRepository + Send + Sync,
    R: RemovedPartRepository + Send + Sync,
    D: Directory + Send + Sync,
    T: RequestTracker + Send + Sync,
    N: NotificationDispatcher + Send + Sync,
{
    /// Create a new service with the default customer request window.
    pub fn new(services: S, removed_parts: R, directory: D, requests: T, notifier: N) -> Self {
        Self {
            services,
            removed_parts,
            directory,
            requests,
            notifier,
            request_window: RequestWindow::default(),
        }
    }

    /// Replace the customer request window.
    #[must_use]
    pub fn with_request_window(mut self, window: RequestWindow) -> Self {
        self.request_window = window;
        self
    }

    /// Open a new `pending` service.
    ///
    /// Customers are limited to the configured number of requests per
    /// rolling window; a partner's services are stamped with the partner id.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] if the actor may not create
    /// services, [`RepairDeskError::Validation`] for malformed input or an
    /// appliance owned by another client, [`RepairDeskError::NotFound`] for a
    /// missing client or appliance, and [`RepairDeskError::Conflict`] when a
    /// customer's request window is full.
    #[tracing::instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_service(
        &self,
        actor: UserId,
        input: NewService,
    ) -> Result<Service, RepairDeskError> {
        let user = authorize_actor(
            &self.directory,
            actor,
            Operation::CreateService,
            &AccessContext::none(),
        )
        .await?;

        let mut builder = Service::builder()
            .client_id(input.client_id)
            .appliance_id(input.appliance_id)
            .created_by(user.id)
            .warranty_status(input.warranty_status)
            .description(input.description);
        if user.role == Role::BusinessPartner {
            builder = builder.business_partner_id(user.id);
        }
        let service = builder.build()?;

        self.check_references(input.client_id, input.appliance_id)
            .await?;

        if user.role == Role::Customer {
            self.admit_customer_request(user.id, service.created_at)
                .await?;
        }

        let service = self.services.create(service).await?;
        tracing::info!(service_id = %service.id, created_by = %user.id, "service created");
        Ok(service)
    }

    async fn check_references(
        &self,
        client_id: ClientId,
        appliance_id: ApplianceId,
    ) -> Result<(), RepairDeskError> {
        if self.directory.get_client(client_id).await?.is_none() {
            return Err(NotFoundError {
                entity: "Client",
                id: client_id.to_string(),
            }
            .into());
        }
        let appliance = self
            .directory
            .get_appliance(appliance_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Appliance",
                id: appliance_id.to_string(),
            })?;
        if appliance.client_id != client_id {
            return Err(ValidationError::ApplianceClientMismatch {
                appliance: appliance_id.to_string(),
                client: client_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn admit_customer_request(
        &self,
        customer: UserId,
        at: Timestamp,
    ) -> Result<(), RepairDeskError> {
        let window = self.request_window;
        let admitted = self
            .requests
            .admit(
                customer,
                RequestKind::ServiceRequest,
                at,
                window.since(at),
                window.max_requests,
            )
            .await?;
        if admitted {
            Ok(())
        } else {
            tracing::info!(%customer, "customer request window full");
            Err(ConflictError::RateLimited {
                limit: window.max_requests,
                window_hours: window.window_hours(),
            }
            .into())
        }
    }

    /// Fetch one service the actor is allowed to see.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] when the service does not exist,
    /// or [`RepairDeskError::Forbidden`] when the actor may not read it.
    #[tracing::instrument(skip(self))]
    pub async fn get_service(&self, actor: UserId, id: ServiceId) -> Result<Service, RepairDeskError> {
        let user = resolve_actor(&self.directory, actor, Operation::ReadService).await?;
        let service = self.load(id).await?;
        role_gate::authorize(
            &user,
            Operation::ReadService,
            &AccessContext::for_service(&service),
        )?;
        Ok(service)
    }

    /// List the services visible to the actor: everything for admins, the
    /// assigned ones for technicians, their own for partners.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Forbidden`] for customers and unknown actors.
    #[tracing::instrument(skip(self))]
    pub async fn list_services(&self, actor: UserId) -> Result<Vec<Service>, RepairDeskError> {
        let user = resolve_actor(&self.directory, actor, Operation::ReadService).await?;
        match user.role {
            Role::Admin => self.services.get_all().await,
            Role::Technician => self.services.find_by_technician(user.id).await,
            Role::BusinessPartner => self.services.find_by_business_partner(user.id).await,
            Role::Customer => Err(ForbiddenError {
                actor: user.id.to_string(),
                operation: Operation::ReadService.as_str(),
            }
            .into()),
        }
    }

    /// Status history of a service, oldest first.
    ///
    /// # Errors
    ///
    /// Same as [`get_service`](Self::get_service).
    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        actor: UserId,
        id: ServiceId,
    ) -> Result<Vec<StatusChange>, RepairDeskError> {
        let service = self.get_service(actor, id).await?;
        self.services.history(service.id).await
    }

    /// Apply one lifecycle operation.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::NotFound`] for a missing service,
    /// [`RepairDeskError::Forbidden`] when the role gate denies the actor,
    /// [`RepairDeskError::Validation`] for bad parameters (negative cost,
    /// assigning a non-technician), and [`RepairDeskError::InvalidTransition`]
    /// when the service's status does not allow the operation or the service
    /// changed concurrently.
    #[tracing::instrument(skip(self, transition), fields(operation = %transition.kind()))]
    pub async fn transition(
        &self,
        actor: UserId,
        id: ServiceId,
        transition: ServiceTransition,
    ) -> Result<Service, RepairDeskError> {
        transition.validate()?;
        let kind = transition.kind();
        let operation = Operation::from(kind);

        let user = resolve_actor(&self.directory, actor, operation).await?;
        let mut service = self.load(id).await?;
        role_gate::authorize(
            &user,
            operation,
            &AccessContext::for_service(&service),
        )?;

        if let ServiceTransition::AssignTechnician { technician_id } = &transition {
            self.require_technician(*technician_id).await?;
        }

        let change = service.apply(&transition, user.id, now())?;

        if kind == TransitionKind::MarkPartsRemoved
            && self.removed_parts.find_by_service(id).await?.is_empty()
        {
            return Err(InvalidTransitionError::NoRemovedParts {
                operation: kind.as_str(),
            }
            .into());
        }

        self.services.save_transition(&service, &change).await?;
        tracing::info!(
            service_id = %service.id,
            from = %change.from,
            to = %change.to,
            actor = %user.id,
            "service transitioned"
        );

        if let Some(notification) = transition_notification(&service, &transition) {
            dispatch_best_effort(&self.notifier, notification).await;
        }
        Ok(service)
    }

    /// Assign a technician to a `pending` service.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn assign_technician(
        &self,
        actor: UserId,
        id: ServiceId,
        technician_id: UserId,
    ) -> Result<Service, RepairDeskError> {
        self.transition(
            actor,
            id,
            ServiceTransition::AssignTechnician { technician_id },
        )
        .await
    }

    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn schedule(
        &self,
        actor: UserId,
        id: ServiceId,
        date: Timestamp,
    ) -> Result<Service, RepairDeskError> {
        self.transition(actor, id, ServiceTransition::Schedule { date })
            .await
    }

    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn start_work(&self, actor: UserId, id: ServiceId) -> Result<Service, RepairDeskError> {
        self.transition(actor, id, ServiceTransition::StartWork)
            .await
    }

    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn request_parts(
        &self,
        actor: UserId,
        id: ServiceId,
        notes: Option<String>,
    ) -> Result<Service, RepairDeskError> {
        self.transition(actor, id, ServiceTransition::RequestParts { notes })
            .await
    }

    /// Requires at least one removed part recorded for the service.
    ///
    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn mark_parts_removed(
        &self,
        actor: UserId,
        id: ServiceId,
    ) -> Result<Service, RepairDeskError> {
        self.transition(actor, id, ServiceTransition::MarkPartsRemoved)
            .await
    }

    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn complete(
        &self,
        actor: UserId,
        id: ServiceId,
        notes: Option<String>,
        cost: Option<i64>,
        is_completely_fixed: Option<bool>,
    ) -> Result<Service, RepairDeskError> {
        self.transition(
            actor,
            id,
            ServiceTransition::Complete {
                notes,
                cost,
                is_completely_fixed,
            },
        )
        .await
    }

    /// # Errors
    ///
    /// See [`transition`](Self::transition).
    pub async fn cancel(
        &self,
        actor: UserId,
        id: ServiceId,
        reason: Option<String>,
    ) -> Result<Service, RepairDeskError> {
        self.transition(actor, id, ServiceTransition::Cancel { reason })
            .await
    }

    /// Record a part taken out of the service's appliance.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::InvalidTransition`] unless the service is
    /// `in_progress` or `device_parts_removed`, plus the usual
    /// not-found/forbidden/validation failures.
    #[tracing::instrument(skip(self, input), fields(part_name = %input.part_name))]
    pub async fn record_removed_part(
        &self,
        actor: UserId,
        service_id: ServiceId,
        input: RemovedPartInput,
    ) -> Result<RemovedPart, RepairDeskError> {
        let operation = Operation::RecordRemovedPart;
        let user = resolve_actor(&self.directory, actor, operation).await?;
        let service = self.load(service_id).await?;
        role_gate::authorize(
            &user,
            operation,
            &AccessContext::for_service(&service),
        )?;
        if !REMOVAL_STATUSES.contains(&service.status) {
            return Err(InvalidTransitionError::WrongStatus {
                operation: operation.as_str(),
                from: service.status,
            }
            .into());
        }

        let technician = service.technician_id.unwrap_or(user.id);
        let mut part = RemovedPart::new(service.id, technician, input.part_name, now())?;
        part.removal_reason = input.removal_reason;
        part.notes = input.notes;

        let part = self.removed_parts.record(part).await?;
        tracing::info!(removed_part_id = %part.id, service_id = %service.id, "removed part recorded");
        Ok(part)
    }

    /// Mark a removed part as given back or reinstalled.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::AlreadyReturned`] when it was already
    /// returned, plus the usual not-found/forbidden failures.
    #[tracing::instrument(skip(self, notes))]
    pub async fn mark_removed_part_returned(
        &self,
        actor: UserId,
        removed_part_id: RemovedPartId,
        return_date: Option<Timestamp>,
        notes: Option<String>,
    ) -> Result<RemovedPart, RepairDeskError> {
        let operation = Operation::ReturnRemovedPart;
        let user = resolve_actor(&self.directory, actor, operation).await?;
        let mut part = self
            .removed_parts
            .get_by_id(removed_part_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "RemovedPart",
                id: removed_part_id.to_string(),
            })?;
        let service = self.load(part.service_id).await?;
        role_gate::authorize(
            &user,
            operation,
            &AccessContext::for_service(&service),
        )?;

        part.mark_returned(return_date.unwrap_or_else(now), notes)?;
        if !self.removed_parts.save_return(&part).await? {
            return Err(AlreadyReturnedError {
                entity: "RemovedPart",
                id: part.id.to_string(),
            }
            .into());
        }
        tracing::info!(removed_part_id = %part.id, "removed part returned");
        Ok(part)
    }

    /// Report that the client was not there for a visit.
    ///
    /// The status does not change; the attempt is counted and noted.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::InvalidTransition`] unless the service is
    /// `assigned`, `scheduled` or `in_progress`, or when the service changed
    /// after it was loaded, plus the usual not-found/forbidden failures.
    #[tracing::instrument(skip(self, notes))]
    pub async fn report_client_not_available(
        &self,
        actor: UserId,
        id: ServiceId,
        notes: Option<String>,
    ) -> Result<Service, RepairDeskError> {
        let operation = Operation::ReportClientNotAvailable;
        let user = resolve_actor(&self.directory, actor, operation).await?;
        let mut service = self.load(id).await?;
        role_gate::authorize(
            &user,
            operation,
            &AccessContext::for_service(&service),
        )?;
        if !VISIT_STATUSES.contains(&service.status) {
            return Err(InvalidTransitionError::WrongStatus {
                operation: operation.as_str(),
                from: service.status,
            }
            .into());
        }

        let at = now();
        service.client_not_available_count += 1;
        let line = match notes.as_deref() {
            Some(text) => format!("Client not available ({}): {text}", at.date_naive()),
            None => format!("Client not available ({})", at.date_naive()),
        };
        service.append_note(&line, at);
        self.services.record_client_absence(&service).await?;
        tracing::info!(
            service_id = %service.id,
            attempts = service.client_not_available_count,
            "client not available"
        );

        let notification = Notification::new(
            NotificationKind::ClientNotAvailable,
            Some(service.id),
            serde_json::json!({
                "client_id": service.client_id,
                "technician_id": service.technician_id,
                "attempts": service.client_not_available_count,
                "notes": notes,
            }),
        );
        dispatch_best_effort(&self.notifier, notification).await;
        Ok(service)
    }

    async fn load(&self, id: ServiceId) -> Result<Service, RepairDeskError> {
        self.services.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Service",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn require_technician(&self, id: UserId) -> Result<(), RepairDeskError> {
        match self.directory.get_user(id).await? {
            Some(user) if user.is_technician() => Ok(()),
            _ => Err(ValidationError::NotATechnician(id.to_string()).into()),
        }
    }
}

fn transition_notification(
    service: &Service,
    transition: &ServiceTransition,
) -> Option<Notification> {
    let (kind, payload) = match transition {
        ServiceTransition::AssignTechnician { technician_id } => (
            NotificationKind::ServiceAssigned,
            serde_json::json!({
                "client_id": service.client_id,
                "technician_id": technician_id,
            }),
        ),
        ServiceTransition::Complete {
            cost,
            is_completely_fixed,
            ..
        } => (
            NotificationKind::ServiceCompleted,
            serde_json::json!({
                "client_id": service.client_id,
                "cost": cost,
                "is_completely_fixed": is_completely_fixed,
            }),
        ),
        ServiceTransition::MarkPartsRemoved => (
            NotificationKind::PartsRemoved,
            serde_json::json!({
                "client_id": service.client_id,
                "technician_id": service.technician_id,
            }),
        ),
        _ => return None,
    };
    Some(Notification::new(kind, Some(service.id), payload))
}
