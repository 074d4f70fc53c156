//! # repairdesk-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the storage, inventory, directory, and request-tracker port
//!   traits defined in `repairdesk-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `repairdesk-app` (for port traits) and `repairdesk-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod columns;
pub mod directory_repo;
pub mod error;
pub mod inventory_store;
pub mod pool;
pub mod removed_part_repo;
pub mod request_tracker;
pub mod service_repo;

pub use directory_repo::SqliteDirectory;
pub use inventory_store::{SqliteInventoryStore, SqliteInventoryTransaction};
pub use pool::{Config, Database};
pub use removed_part_repo::SqliteRemovedPartRepository;
pub use request_tracker::SqliteRequestTracker;
pub use service_repo::SqliteServiceRepository;
