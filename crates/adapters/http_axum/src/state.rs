//! Shared application state for axum handlers.

use std::sync::Arc;

use repairdesk_app::ports::{
    Directory, InventoryStore, NotificationDispatcher, RemovedPartRepository, RequestTracker,
    ServiceRepository,
};
use repairdesk_app::services::allocation_coordinator::AllocationCoordinator;
use repairdesk_app::services::parts_inventory::PartsInventory;
use repairdesk_app::services::service_lifecycle::ServiceLifecycle;

/// The concrete port implementations a server is wired with.
///
/// Handlers are generic over this one parameter instead of every port, and
/// still avoid dynamic dispatch.
pub trait Ports: Send + Sync + 'static {
    type Services: ServiceRepository + Send + Sync + 'static;
    type RemovedParts: RemovedPartRepository + Send + Sync + 'static;
    type Inventory: InventoryStore + Send + Sync + 'static;
    type Directory: Directory + Send + Sync + 'static;
    type Requests: RequestTracker + Send + Sync + 'static;
    type Notifier: NotificationDispatcher + Send + Sync + 'static;
}

pub type Lifecycle<P> = ServiceLifecycle<
    <P as Ports>::Services,
    <P as Ports>::RemovedParts,
    <P as Ports>::Directory,
    <P as Ports>::Requests,
    <P as Ports>::Notifier,
>;

pub type Coordinator<P> = AllocationCoordinator<
    <P as Ports>::Inventory,
    <P as Ports>::Services,
    <P as Ports>::Directory,
    <P as Ports>::Notifier,
>;

pub type Inventory<P> = PartsInventory<<P as Ports>::Inventory, <P as Ports>::Directory>;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented by hand: only the `Arc` wrappers are cloned.
pub struct AppState<P: Ports> {
    /// Service intake, transitions, and field reports.
    pub lifecycle: Arc<Lifecycle<P>>,
    /// Allocation ledger writes.
    pub coordinator: Arc<Coordinator<P>>,
    /// Parts catalogue and balances.
    pub inventory: Arc<Inventory<P>>,
}

impl<P: Ports> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: Arc::clone(&self.lifecycle),
            coordinator: Arc::clone(&self.coordinator),
            inventory: Arc::clone(&self.inventory),
        }
    }
}

impl<P: Ports> AppState<P> {
    /// Create a new application state from service instances.
    pub fn new(
        lifecycle: Lifecycle<P>,
        coordinator: Coordinator<P>,
        inventory: Inventory<P>,
    ) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            coordinator: Arc::new(coordinator),
            inventory: Arc::new(inventory),
        }
    }
}
