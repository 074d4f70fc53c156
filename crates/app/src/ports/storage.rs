//! Storage port: repository traits for service records.

use std::future::Future;
use std::sync::Arc;

use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::{RemovedPartId, ServiceId, UserId};
use repairdesk_domain::removed_part::RemovedPart;
use repairdesk_domain::service::{Service, StatusChange};

/// Persistence for [`Service`]s and their status history.
pub trait ServiceRepository {
    /// Persist a freshly created service.
    fn create(
        &self,
        service: Service,
    ) -> impl Future<Output = Result<Service, RepairDeskError>> + Send;

    fn get_by_id(
        &self,
        id: ServiceId,
    ) -> impl Future<Output = Result<Option<Service>, RepairDeskError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send;

    fn find_by_technician(
        &self,
        technician: UserId,
    ) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send;

    fn find_by_business_partner(
        &self,
        partner: UserId,
    ) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send;

    /// Store `service` after [`Service::apply`] produced `change`, appending
    /// `change` to the history in the same unit of work.
    ///
    /// The write only lands if the stored record is still at the revision,
    /// status and absence count `change` was applied from. Otherwise nothing
    /// is written and
    /// [`InvalidTransitionError::Stale`](repairdesk_domain::error::InvalidTransitionError::Stale)
    /// is returned.
    fn save_transition(
        &self,
        service: &Service,
        change: &StatusChange,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send;

    /// Store a "client not available" report: `service` carries the
    /// incremented absence count and the appended note.
    ///
    /// Compare-and-set like [`save_transition`](Self::save_transition): the
    /// write only lands if the stored record still has the same revision and
    /// status and one absence fewer. Status and revision are left untouched.
    fn record_client_absence(
        &self,
        service: &Service,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send;

    /// Status history ordered by sequence.
    fn history(
        &self,
        id: ServiceId,
    ) -> impl Future<Output = Result<Vec<StatusChange>, RepairDeskError>> + Send;
}

/// Persistence for parts taken out of client appliances.
pub trait RemovedPartRepository {
    fn record(
        &self,
        part: RemovedPart,
    ) -> impl Future<Output = Result<RemovedPart, RepairDeskError>> + Send;

    fn get_by_id(
        &self,
        id: RemovedPartId,
    ) -> impl Future<Output = Result<Option<RemovedPart>, RepairDeskError>> + Send;

    fn find_by_service(
        &self,
        service: ServiceId,
    ) -> impl Future<Output = Result<Vec<RemovedPart>, RepairDeskError>> + Send;

    /// Store the return of `part`, only if the stored record has not been
    /// returned yet. Returns `false` when another caller got there first.
    fn save_return(
        &self,
        part: &RemovedPart,
    ) -> impl Future<Output = Result<bool, RepairDeskError>> + Send;
}

impl<T: ServiceRepository + Send + Sync> ServiceRepository for Arc<T> {
    fn create(
        &self,
        service: Service,
    ) -> impl Future<Output = Result<Service, RepairDeskError>> + Send {
        (**self).create(service)
    }

    fn get_by_id(
        &self,
        id: ServiceId,
    ) -> impl Future<Output = Result<Option<Service>, RepairDeskError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send {
        (**self).get_all()
    }

    fn find_by_technician(
        &self,
        technician: UserId,
    ) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send {
        (**self).find_by_technician(technician)
    }

    fn find_by_business_partner(
        &self,
        partner: UserId,
    ) -> impl Future<Output = Result<Vec<Service>, RepairDeskError>> + Send {
        (**self).find_by_business_partner(partner)
    }

    fn save_transition(
        &self,
        service: &Service,
        change: &StatusChange,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send {
        (**self).save_transition(service, change)
    }

    fn record_client_absence(
        &self,
        service: &Service,
    ) -> impl Future<Output = Result<(), RepairDeskError>> + Send {
        (**self).record_client_absence(service)
    }

    fn history(
        &self,
        id: ServiceId,
    ) -> impl Future<Output = Result<Vec<StatusChange>, RepairDeskError>> + Send {
        (**self).history(id)
    }
}

impl<T: RemovedPartRepository + Send + Sync> RemovedPartRepository for Arc<T> {
    fn record(
        &self,
        part: RemovedPart,
    ) -> impl Future<Output = Result<RemovedPart, RepairDeskError>> + Send {
        (**self).record(part)
    }

    fn get_by_id(
        &self,
        id: RemovedPartId,
    ) -> impl Future<Output = Result<Option<RemovedPart>, RepairDeskError>> + Send {
        (**self).get_by_id(id)
    }

    fn find_by_service(
        &self,
        service: ServiceId,
    ) -> impl Future<Output = Result<Vec<RemovedPart>, RepairDeskError>> + Send {
        (**self).find_by_service(service)
    }

    fn save_return(
        &self,
        part: &RemovedPart,
    ) -> impl Future<Output = Result<bool, RepairDeskError>> + Send {
        (**self).save_return(part)
    }
}
