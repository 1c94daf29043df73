use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Marketplace role of an authenticated caller.
///
/// `Unknown` stands for any role name the identity provider emits that this
/// service does not know about; it never has an entry in the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Artisan,
    Distributor,
    Admin,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub const KNOWN: [Role; 4] = [Role::Customer, Role::Artisan, Role::Distributor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Artisan => "artisan",
            Self::Distributor => "distributor",
            Self::Admin => "admin",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "customer" => Self::Customer,
            "artisan" => Self::Artisan,
            "distributor" => Self::Distributor,
            "admin" => Self::Admin,
            _ => Self::Unknown,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub identity: bool,
    pub email: bool,
    pub phone: bool,
}

/// The authenticated caller of one request. Produced by the authenticator and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub user_id: String,
    pub role: Role,
    pub verification: Verification,
    pub has_address: bool,
}

impl IdentityContext {
    pub fn new(user_id: impl ToString, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            verification: Verification::default(),
            has_address: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
