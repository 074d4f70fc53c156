//! Directory records: users, clients, and appliances.
//!
//! These carry no business invariants beyond existence; the core only needs
//! to resolve them when an operation references one.

use serde::{Deserialize, Serialize};

use crate::error::{RepairDeskError, ValidationError};
use crate::id::{ApplianceId, ClientId, UserId};

/// The capability set an actor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Technician,
    BusinessPartner,
    Customer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Technician => "technician",
            Self::BusinessPartner => "business_partner",
            Self::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "technician" => Ok(Self::Technician),
            "business_partner" => Ok(Self::BusinessPartner),
            "customer" => Ok(Self::Customer),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// Someone who can act on the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub active: bool,
}

impl User {
    /// Create an active user.
    ///
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] when `name` is empty.
    pub fn new(name: impl Into<String>, role: Role) -> Result<Self, RepairDeskError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(Self {
            id: UserId::new(),
            name,
            role,
            active: true,
        })
    }

    /// Whether this user can hold part allocations and be assigned to services.
    #[must_use]
    pub fn is_technician(&self) -> bool {
        self.active && self.role == Role::Technician
    }
}

/// The owner of one or more appliances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Client {
    /// # Errors
    ///
    /// Returns [`RepairDeskError::Validation`] when `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, RepairDeskError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(Self {
            id: ClientId::new(),
            name,
            phone: None,
            email: None,
        })
    }
}

/// A client's device brought in for repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appliance {
    pub id: ApplianceId,
    pub client_id: ClientId,
    pub category: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
}

impl Appliance {
    #[must_use]
    pub fn new(client_id: ClientId, category: impl Into<String>) -> Self {
        Self {
            id: ApplianceId::new(),
            client_id,
            category: category.into(),
            manufacturer: None,
            model: None,
            serial_number: None,
        }
    }
}
