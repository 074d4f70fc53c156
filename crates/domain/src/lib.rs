//! # repairdesk-domain
//!
//! Pure domain model for the repairdesk appliance-repair back office.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **Services** (repair jobs) and their lifecycle state machine
//! - Define **Available parts**, **Part allocations**, and the **Activity log**
//!   that together form the spare-parts ledger
//! - Define **Removed parts** (components taken out of a client's appliance)
//! - Define **Notifications** emitted by lifecycle and ledger operations
//! - Define the **Role gate** capability table
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod activity;
pub mod allocation;
pub mod directory;
pub mod notification;
pub mod part;
pub mod removed_part;
pub mod request;
pub mod role_gate;
pub mod service;
