pub mod config;
pub mod matrix;
pub mod ownership;
pub mod permission;

use std::fmt::Display;

use actix_web::http::Method;
use serde::{Deserialize, Serialize};

use super::error::GuardError;

/// Action a caller performs on a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Search,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Search => "search",
        }
    }

    /// Maps an HTTP method on a resource endpoint to an action. `with_id` tells
    /// whether the path names one instance.
    pub fn from_method(method: &Method, with_id: bool) -> Option<Self> {
        let action = match *method {
            Method::GET if with_id => Self::Read,
            Method::GET => Self::Search,
            Method::POST => Self::Create,
            Method::PUT | Method::PATCH => Self::Update,
            Method::DELETE => Self::Delete,
            _ => return None,
        };
        Some(action)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Possible responses from a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzResponse {
    Allow,
    Deny(GuardError),
}
