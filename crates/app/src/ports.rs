//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod directory;
pub mod inventory;
pub mod notification;
pub mod request_tracker;
pub mod storage;

pub use directory::Directory;
pub use inventory::{InventoryStore, InventoryTransaction};
pub use notification::{NotificationDispatcher, NotificationError, NotificationTransport};
pub use request_tracker::RequestTracker;
pub use storage::{RemovedPartRepository, ServiceRepository};
