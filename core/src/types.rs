//! Shared primitive types used across the entire desk.

use serde::{Deserialize, Serialize};

/// A stable, unique identifier for a client.
pub type ClientId = String;

/// A stable, unique identifier for a financing record.
pub type RecordId = String;

/// A stable, unique identifier for an appointment.
pub type AppointmentId = String;

/// A stable, unique identifier for a co-signer edge.
pub type EdgeId = String;

/// A staff member's identifier, as issued by the external directory.
pub type UserId = String;

/// Staff roles, supplied by the external directory/auth collaborator.
/// The desk only checks them; it never authenticates anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Salesperson,
    Bdc,
    BdcManager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Salesperson => "salesperson",
            Role::Bdc => "bdc",
            Role::BdcManager => "bdc_manager",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn salesperson(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Salesperson)
    }

    pub fn admin(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Read-only lookup into the external staff directory, used to refresh
/// denormalized display names (e.g. a record's collaborator) on read.
pub trait StaffDirectory {
    fn display_name(&self, user_id: &str) -> Option<String>;
}
