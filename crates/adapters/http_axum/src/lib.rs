//! # repairdesk-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for the repair desk
//!   (`/api/services`, `/api/parts`, `/api/allocations`, …)
//! - Identify the calling user from the `x-user-id` header; every use-case
//!   then resolves and authorizes that user itself
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map typed domain errors onto HTTP status codes
//!
//! ## Dependency rule
//! Depends on `repairdesk-app` (for port traits and services) and
//! `repairdesk-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod actor;
pub mod api;
pub mod error;
pub mod router;
pub mod state;
