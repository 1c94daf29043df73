use serde::{Deserialize, Serialize};

use crate::types::identity::{IdentityContext, Role, Verification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    Authorized,
    Unauthorized,
    Forbidden,
    Locked,
    RateLimited,
    ClientError,
    ServerError,
    Success,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "AUTHORIZED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Locked => "LOCKED",
            Self::RateLimited => "RATE_LIMITED",
            Self::ClientError => "CLIENT_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::Success => "SUCCESS",
        }
    }

    /// Maps the final status code, `authenticated` tells a granted request from
    /// a public one.
    pub fn from_status(status: u16, authenticated: bool) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            423 => Self::Locked,
            429 => Self::RateLimited,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ if authenticated => Self::Authorized,
            _ => Self::Success,
        }
    }

    pub fn default_code(&self) -> &'static str {
        match self {
            Self::Authorized => "ACCESS_GRANTED",
            Self::Unauthorized => "AUTHENTICATION_REQUIRED",
            Self::Forbidden => "ACCESS_FORBIDDEN",
            Self::Locked => "ACCOUNT_LOCKED",
            Self::RateLimited => "RATE_LIMIT_EXCEEDED",
            Self::ClientError => "CLIENT_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::Success => "PUBLIC_ACCESS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub status: AuthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl AuthInfo {
    pub fn from_identity(identity: Option<&IdentityContext>) -> Self {
        match identity {
            Some(identity) => Self {
                status: AuthStatus::Authenticated,
                role: Some(identity.role),
                user_id: Some(identity.user_id.clone()),
                verification: Some(identity.verification),
            },
            None => Self {
                status: AuthStatus::Unauthenticated,
                role: None,
                user_id: None,
                verification: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationInfo {
    pub status: AuthorizationStatus,
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuthorizationInfo {
    /// The denial code recorded by a guard stage takes precedence over the
    /// default code of the status.
    pub fn classify(
        status: u16,
        authenticated: bool,
        denial_code: Option<&str>,
        reason: Option<&str>,
    ) -> Self {
        let status = AuthorizationStatus::from_status(status, authenticated);
        let code = denial_code.unwrap_or(status.default_code());
        Self {
            status,
            code: code.to_string(),
            reason: reason.map(String::from),
        }
    }
}
