//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//! Every use-case takes the acting user's id, resolves it through the
//! [`Directory`] and passes the result through the role gate before touching
//! any store.

pub mod allocation_coordinator;
pub mod parts_inventory;
pub mod service_lifecycle;

use repairdesk_domain::directory::User;
use repairdesk_domain::error::{ForbiddenError, RepairDeskError};
use repairdesk_domain::id::UserId;
use repairdesk_domain::role_gate::{self, AccessContext, Operation};

use crate::ports::Directory;

/// Look up `actor` and check `operation` against the role gate.
///
/// Unknown and inactive users are rejected with [`RepairDeskError::Forbidden`].
pub(crate) async fn authorize_actor<D: Directory>(
    directory: &D,
    actor: UserId,
    operation: Operation,
    ctx: &AccessContext,
) -> Result<User, RepairDeskError> {
    let user = resolve_actor(directory, actor, operation).await?;
    role_gate::authorize(&user, operation, ctx)?;
    Ok(user)
}

/// Look up `actor` without checking a capability yet.
pub(crate) async fn resolve_actor<D: Directory>(
    directory: &D,
    actor: UserId,
    operation: Operation,
) -> Result<User, RepairDeskError> {
    match directory.get_user(actor).await? {
        Some(user) if user.active => Ok(user),
        _ => Err(ForbiddenError {
            actor: actor.to_string(),
            operation: operation.as_str(),
        }
        .into()),
    }
}
