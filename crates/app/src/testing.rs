//! In-memory implementations of every port, shared by the use-case tests.
//!
//! They follow the same contract as the SQLite adapters: the inventory
//! double serialises transactions behind one lock and only publishes staged
//! writes on commit, and the service double rejects stale revisions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use repairdesk_domain::activity::ActivityLogEntry;
use repairdesk_domain::allocation::{AllocationQuery, AllocationStatus, PartAllocation};
use repairdesk_domain::directory::{Appliance, Client, Role, User};
use repairdesk_domain::error::{InvalidTransitionError, NotFoundError, RepairDeskError};
use repairdesk_domain::id::{AllocationId, ApplianceId, ClientId, PartId, RemovedPartId, ServiceId, UserId};
use repairdesk_domain::notification::Notification;
use repairdesk_domain::part::{AvailablePart, PartQuery, QuantityUpdate};
use repairdesk_domain::removed_part::RemovedPart;
use repairdesk_domain::request::RequestKind;
use repairdesk_domain::service::{Service, StatusChange};
use repairdesk_domain::time::Timestamp;

use crate::ports::{
    Directory, InventoryStore, InventoryTransaction, NotificationDispatcher, NotificationError,
    RemovedPartRepository, RequestTracker, ServiceRepository,
};
use crate::services::allocation_coordinator::AllocationCoordinator;
use crate::services::parts_inventory::PartsInventory;
use crate::services::service_lifecycle::ServiceLifecycle;

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryServices {
    services: Mutex<HashMap<ServiceId, Service>>,
    history: Mutex<Vec<StatusChange>>,
}

impl ServiceRepository for InMemoryServices {
    async fn create(&self, service: Service) -> Result<Service, RepairDeskError> {
        self.services
            .lock()
            .unwrap()
            .insert(service.id, service.clone());
        Ok(service)
    }

    async fn get_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepairDeskError> {
        Ok(self.services.lock().unwrap().get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Service>, RepairDeskError> {
        Ok(self.services.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_technician(&self, technician: UserId) -> Result<Vec<Service>, RepairDeskError> {
        Ok(self
            .services
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.technician_id == Some(technician))
            .cloned()
            .collect())
    }

    async fn find_by_business_partner(
        &self,
        partner: UserId,
    ) -> Result<Vec<Service>, RepairDeskError> {
        Ok(self
            .services
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.business_partner_id == Some(partner))
            .cloned()
            .collect())
    }

    async fn save_transition(
        &self,
        service: &Service,
        change: &StatusChange,
    ) -> Result<(), RepairDeskError> {
        let expected = service.revision - 1;
        let mut services = self.services.lock().unwrap();
        let stored = services.get_mut(&service.id).ok_or_else(|| NotFoundError {
            entity: "Service",
            id: service.id.to_string(),
        })?;
        if stored.revision != expected
            || stored.status != change.from
            || stored.client_not_available_count != service.client_not_available_count
        {
            return Err(InvalidTransitionError::Stale { expected }.into());
        }
        *stored = service.clone();
        self.history.lock().unwrap().push(change.clone());
        Ok(())
    }

    async fn record_client_absence(&self, service: &Service) -> Result<(), RepairDeskError> {
        let mut services = self.services.lock().unwrap();
        let stored = services.get_mut(&service.id).ok_or_else(|| NotFoundError {
            entity: "Service",
            id: service.id.to_string(),
        })?;
        if stored.revision != service.revision
            || stored.status != service.status
            || stored.client_not_available_count + 1 != service.client_not_available_count
        {
            return Err(InvalidTransitionError::Stale {
                expected: service.revision,
            }
            .into());
        }
        stored.technician_notes.clone_from(&service.technician_notes);
        stored.client_not_available_count = service.client_not_available_count;
        stored.updated_at = service.updated_at;
        Ok(())
    }

    async fn history(&self, id: ServiceId) -> Result<Vec<StatusChange>, RepairDeskError> {
        let mut entries: Vec<StatusChange> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.service_id == id)
            .cloned()
            .collect();
        entries.sort_by_key(|c| c.sequence);
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Removed parts
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRemovedParts {
    parts: Mutex<HashMap<RemovedPartId, RemovedPart>>,
}

impl RemovedPartRepository for InMemoryRemovedParts {
    async fn record(&self, part: RemovedPart) -> Result<RemovedPart, RepairDeskError> {
        self.parts.lock().unwrap().insert(part.id, part.clone());
        Ok(part)
    }

    async fn get_by_id(&self, id: RemovedPartId) -> Result<Option<RemovedPart>, RepairDeskError> {
        Ok(self.parts.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_service(&self, service: ServiceId) -> Result<Vec<RemovedPart>, RepairDeskError> {
        Ok(self
            .parts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.service_id == service)
            .cloned()
            .collect())
    }

    async fn save_return(&self, part: &RemovedPart) -> Result<bool, RepairDeskError> {
        let mut parts = self.parts.lock().unwrap();
        match parts.get_mut(&part.id) {
            Some(stored) if !stored.is_returned() => {
                *stored = part.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Ledger {
    parts: HashMap<PartId, AvailablePart>,
    allocations: HashMap<AllocationId, PartAllocation>,
    activity: Vec<ActivityLogEntry>,
}

#[derive(Default)]
pub struct InMemoryInventory {
    ledger: Arc<tokio::sync::Mutex<Ledger>>,
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Ledger>,
    staged: Ledger,
}

fn part_not_found(id: PartId) -> RepairDeskError {
    NotFoundError {
        entity: "AvailablePart",
        id: id.to_string(),
    }
    .into()
}

impl InventoryStore for InMemoryInventory {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, RepairDeskError> {
        let guard = Arc::clone(&self.ledger).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction { guard, staged })
    }

    async fn get_part(&self, id: PartId) -> Result<Option<AvailablePart>, RepairDeskError> {
        Ok(self.ledger.lock().await.parts.get(&id).cloned())
    }

    async fn get_all_parts(&self) -> Result<Vec<AvailablePart>, RepairDeskError> {
        Ok(self.ledger.lock().await.parts.values().cloned().collect())
    }

    async fn search_parts(&self, query: &PartQuery) -> Result<Vec<AvailablePart>, RepairDeskError> {
        Ok(self
            .ledger
            .lock()
            .await
            .parts
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    async fn get_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<PartAllocation>, RepairDeskError> {
        Ok(self.ledger.lock().await.allocations.get(&id).cloned())
    }

    async fn find_allocations(
        &self,
        query: &AllocationQuery,
    ) -> Result<Vec<PartAllocation>, RepairDeskError> {
        Ok(self
            .ledger
            .lock()
            .await
            .allocations
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect())
    }

    async fn activity_for_part(&self, part: PartId) -> Result<Vec<ActivityLogEntry>, RepairDeskError> {
        Ok(self
            .ledger
            .lock()
            .await
            .activity
            .iter()
            .filter(|e| e.part_id == part)
            .cloned()
            .collect())
    }
}

impl InventoryTransaction for InMemoryTransaction {
    async fn get_part(&mut self, id: PartId) -> Result<Option<AvailablePart>, RepairDeskError> {
        Ok(self.staged.parts.get(&id).cloned())
    }

    async fn insert_part(&mut self, part: &AvailablePart) -> Result<(), RepairDeskError> {
        self.staged.parts.insert(part.id, part.clone());
        Ok(())
    }

    async fn decrement_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        let part = self.staged.parts.get_mut(&id).ok_or_else(|| part_not_found(id))?;
        if part.quantity < amount {
            return Ok(QuantityUpdate::Insufficient {
                available: part.quantity,
            });
        }
        let before = part.quantity;
        part.quantity -= amount;
        Ok(QuantityUpdate::Applied {
            before,
            after: part.quantity,
        })
    }

    async fn increment_part_quantity(
        &mut self,
        id: PartId,
        amount: u32,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        let part = self.staged.parts.get_mut(&id).ok_or_else(|| part_not_found(id))?;
        let before = part.quantity;
        let Some(after) = before.checked_add(amount) else {
            return Ok(QuantityUpdate::Insufficient { available: before });
        };
        part.quantity = after;
        Ok(QuantityUpdate::Applied { before, after })
    }

    async fn adjust_part_quantity(
        &mut self,
        id: PartId,
        delta: i64,
    ) -> Result<QuantityUpdate, RepairDeskError> {
        let part = self.staged.parts.get_mut(&id).ok_or_else(|| part_not_found(id))?;
        let before = part.quantity;
        match u32::try_from(i64::from(before) + delta) {
            Ok(after) => {
                part.quantity = after;
                Ok(QuantityUpdate::Applied { before, after })
            }
            Err(_) => Ok(QuantityUpdate::Insufficient { available: before }),
        }
    }

    async fn get_allocation(
        &mut self,
        id: AllocationId,
    ) -> Result<Option<PartAllocation>, RepairDeskError> {
        Ok(self.staged.allocations.get(&id).cloned())
    }

    async fn insert_allocation(&mut self, allocation: &PartAllocation) -> Result<(), RepairDeskError> {
        self.staged
            .allocations
            .insert(allocation.id, allocation.clone());
        Ok(())
    }

    async fn update_allocation_status(
        &mut self,
        allocation: &PartAllocation,
        expected: AllocationStatus,
    ) -> Result<bool, RepairDeskError> {
        match self.staged.allocations.get_mut(&allocation.id) {
            Some(stored) if stored.status == expected => {
                stored.status = allocation.status;
                stored.returned_at = allocation.returned_at;
                stored.return_notes.clone_from(&allocation.return_notes);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_outstanding_allocations(&mut self, part: PartId) -> Result<u64, RepairDeskError> {
        Ok(self
            .staged
            .allocations
            .values()
            .filter(|a| a.part_id == part && a.is_outstanding())
            .count() as u64)
    }

    async fn allocated_quantity(&mut self, part: PartId) -> Result<u64, RepairDeskError> {
        Ok(self
            .staged
            .allocations
            .values()
            .filter(|a| a.part_id == part && a.is_outstanding())
            .map(|a| u64::from(a.allocated_quantity))
            .sum())
    }

    async fn activity_for_part(
        &mut self,
        part: PartId,
    ) -> Result<Vec<ActivityLogEntry>, RepairDeskError> {
        Ok(self
            .staged
            .activity
            .iter()
            .filter(|e| e.part_id == part)
            .cloned()
            .collect())
    }

    async fn delete_unused_part(&mut self, id: PartId) -> Result<Option<u32>, RepairDeskError> {
        let in_use = self
            .staged
            .allocations
            .values()
            .any(|a| a.part_id == id && a.is_outstanding());
        if in_use {
            return Ok(None);
        }
        Ok(self.staged.parts.remove(&id).map(|p| p.quantity))
    }

    async fn append_activity_log(&mut self, entry: &ActivityLogEntry) -> Result<(), RepairDeskError> {
        self.staged.activity.push(entry.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepairDeskError> {
        *self.guard = self.staged;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashMap<UserId, User>>,
    clients: Mutex<HashMap<ClientId, Client>>,
    appliances: Mutex<HashMap<ApplianceId, Appliance>>,
}

impl InMemoryDirectory {
    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn set_active(&self, id: UserId, active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.active = active;
        }
    }
}

impl Directory for InMemoryDirectory {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepairDeskError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_users_by_role(&self, role: Role) -> Result<Vec<User>, RepairDeskError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: User) -> Result<User, RepairDeskError> {
        self.insert_user(user.clone());
        Ok(user)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, RepairDeskError> {
        Ok(self.clients.lock().unwrap().get(&id).cloned())
    }

    async fn create_client(&self, client: Client) -> Result<Client, RepairDeskError> {
        self.clients.lock().unwrap().insert(client.id, client.clone());
        Ok(client)
    }

    async fn get_appliance(&self, id: ApplianceId) -> Result<Option<Appliance>, RepairDeskError> {
        Ok(self.appliances.lock().unwrap().get(&id).cloned())
    }

    async fn create_appliance(&self, appliance: Appliance) -> Result<Appliance, RepairDeskError> {
        self.appliances
            .lock()
            .unwrap()
            .insert(appliance.id, appliance.clone());
        Ok(appliance)
    }
}

// ---------------------------------------------------------------------------
// Request tracking
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRequests {
    rows: Mutex<Vec<(UserId, RequestKind, Timestamp)>>,
}

impl InMemoryRequests {
    fn count(rows: &[(UserId, RequestKind, Timestamp)], user: UserId, kind: RequestKind, since: Timestamp) -> u32 {
        let n = rows
            .iter()
            .filter(|(u, k, at)| *u == user && *k == kind && *at >= since)
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

impl RequestTracker for InMemoryRequests {
    async fn count_requests_since(
        &self,
        user: UserId,
        kind: RequestKind,
        since: Timestamp,
    ) -> Result<u32, RepairDeskError> {
        Ok(Self::count(&self.rows.lock().unwrap(), user, kind, since))
    }

    async fn admit(
        &self,
        user: UserId,
        kind: RequestKind,
        at: Timestamp,
        since: Timestamp,
        limit: u32,
    ) -> Result<bool, RepairDeskError> {
        let mut rows = self.rows.lock().unwrap();
        if Self::count(&rows, user, kind, since) >= limit {
            return Ok(false);
        }
        rows.push((user, kind, at));
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Records every notification; fails every call when `failing` is set.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<Notification>>,
    pub failing: Mutex<bool>,
}

impl RecordingDispatcher {
    pub fn kinds(&self) -> Vec<repairdesk_domain::notification::NotificationKind> {
        self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        if *self.failing.lock().unwrap() {
            return Err(NotificationError::Closed);
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub type Lifecycle = ServiceLifecycle<
    Arc<InMemoryServices>,
    Arc<InMemoryRemovedParts>,
    Arc<InMemoryDirectory>,
    Arc<InMemoryRequests>,
    Arc<RecordingDispatcher>,
>;

pub type Coordinator = AllocationCoordinator<
    Arc<InMemoryInventory>,
    Arc<InMemoryServices>,
    Arc<InMemoryDirectory>,
    Arc<RecordingDispatcher>,
>;

pub type Inventory = PartsInventory<Arc<InMemoryInventory>, Arc<InMemoryDirectory>>;

/// A populated repair desk: one user per role plus a second technician,
/// and one client owning one appliance.
pub struct World {
    pub services: Arc<InMemoryServices>,
    pub removed_parts: Arc<InMemoryRemovedParts>,
    pub inventory_store: Arc<InMemoryInventory>,
    pub directory: Arc<InMemoryDirectory>,
    pub requests: Arc<InMemoryRequests>,
    pub notifier: Arc<RecordingDispatcher>,
    pub admin: User,
    pub technician: User,
    pub other_technician: User,
    pub partner: User,
    pub customer: User,
    pub client: Client,
    pub appliance: Appliance,
}

impl World {
    pub fn new() -> Self {
        let directory = Arc::new(InMemoryDirectory::default());
        let admin = User::new("Ada Admin", Role::Admin).unwrap();
        let technician = User::new("Tom Tech", Role::Technician).unwrap();
        let other_technician = User::new("Tia Tech", Role::Technician).unwrap();
        let partner = User::new("Pat Partner", Role::BusinessPartner).unwrap();
        let customer = User::new("Cal Customer", Role::Customer).unwrap();
        for user in [&admin, &technician, &other_technician, &partner, &customer] {
            directory.insert_user(user.clone());
        }

        let client = Client::new("Marta Client").unwrap();
        let appliance = Appliance::new(client.id, "washing_machine");
        directory
            .clients
            .lock()
            .unwrap()
            .insert(client.id, client.clone());
        directory
            .appliances
            .lock()
            .unwrap()
            .insert(appliance.id, appliance.clone());

        Self {
            services: Arc::default(),
            removed_parts: Arc::default(),
            inventory_store: Arc::default(),
            directory,
            requests: Arc::default(),
            notifier: Arc::default(),
            admin,
            technician,
            other_technician,
            partner,
            customer,
            client,
            appliance,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        ServiceLifecycle::new(
            Arc::clone(&self.services),
            Arc::clone(&self.removed_parts),
            Arc::clone(&self.directory),
            Arc::clone(&self.requests),
            Arc::clone(&self.notifier),
        )
    }

    pub fn coordinator(&self) -> Coordinator {
        AllocationCoordinator::new(
            Arc::clone(&self.inventory_store),
            Arc::clone(&self.services),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
        )
    }

    pub fn inventory(&self) -> Inventory {
        PartsInventory::new(Arc::clone(&self.inventory_store), Arc::clone(&self.directory))
    }
}
