//! # repairdesk-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ServiceRepository`: services and their status history
//!   - `RemovedPartRepository`: parts taken out of client appliances
//!   - `InventoryStore` / `InventoryTransaction`: the atomic parts ledger
//!   - `Directory`: users, clients, appliances
//!   - `RequestTracker`: rolling-window request limits
//!   - `NotificationDispatcher` / `NotificationTransport`: outbound notices
//! - Define **driving/inbound ports** as use-case structs:
//!   - `ServiceLifecycle`: intake, guarded transitions, field reports
//!   - `AllocationCoordinator`: allocate, return, adjust, delete stock
//!   - `PartsInventory`: receive parts, search, balances
//! - Provide **in-process infrastructure** (notification queue and worker)
//!   that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `repairdesk-domain` only (plus `tokio` for the notification
//! queue). Never imports adapter crates. Adapters depend on *this* crate, not
//! the reverse.

pub mod notifications;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
