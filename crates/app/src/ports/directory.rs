//! Directory port: users, clients, and appliances.
//!
//! The core only needs referential existence from these records.

use std::future::Future;
use std::sync::Arc;

use repairdesk_domain::directory::{Appliance, Client, Role, User};
use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::{ApplianceId, ClientId, UserId};

pub trait Directory {
    fn get_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepairDeskError>> + Send;

    fn find_users_by_role(
        &self,
        role: Role,
    ) -> impl Future<Output = Result<Vec<User>, RepairDeskError>> + Send;

    fn create_user(&self, user: User) -> impl Future<Output = Result<User, RepairDeskError>> + Send;

    fn get_client(
        &self,
        id: ClientId,
    ) -> impl Future<Output = Result<Option<Client>, RepairDeskError>> + Send;

    fn create_client(
        &self,
        client: Client,
    ) -> impl Future<Output = Result<Client, RepairDeskError>> + Send;

    fn get_appliance(
        &self,
        id: ApplianceId,
    ) -> impl Future<Output = Result<Option<Appliance>, RepairDeskError>> + Send;

    fn create_appliance(
        &self,
        appliance: Appliance,
    ) -> impl Future<Output = Result<Appliance, RepairDeskError>> + Send;
}

impl<T: Directory + Send + Sync> Directory for Arc<T> {
    fn get_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepairDeskError>> + Send {
        (**self).get_user(id)
    }

    fn find_users_by_role(
        &self,
        role: Role,
    ) -> impl Future<Output = Result<Vec<User>, RepairDeskError>> + Send {
        (**self).find_users_by_role(role)
    }

    fn create_user(&self, user: User) -> impl Future<Output = Result<User, RepairDeskError>> + Send {
        (**self).create_user(user)
    }

    fn get_client(
        &self,
        id: ClientId,
    ) -> impl Future<Output = Result<Option<Client>, RepairDeskError>> + Send {
        (**self).get_client(id)
    }

    fn create_client(
        &self,
        client: Client,
    ) -> impl Future<Output = Result<Client, RepairDeskError>> + Send {
        (**self).create_client(client)
    }

    fn get_appliance(
        &self,
        id: ApplianceId,
    ) -> impl Future<Output = Result<Option<Appliance>, RepairDeskError>> + Send {
        (**self).get_appliance(id)
    }

    fn create_appliance(
        &self,
        appliance: Appliance,
    ) -> impl Future<Output = Result<Appliance, RepairDeskError>> + Send {
        (**self).create_appliance(appliance)
    }
}
