pub mod config;
pub mod jwt;

use actix_web::HttpRequest;
use anyhow::Result;

use crate::types::identity::IdentityContext;

/// Produces the identity context of a request.
pub trait Authenticator: Send + Sync {
    fn authenticate_request(&self, req: &HttpRequest) -> Result<AuthnResponse>;
}

#[derive(Debug, Clone)]
pub enum AuthnResponse {
    /// Valid credentials
    Ok(IdentityContext),
    /// No credentials were presented
    Anonymous,
    /// Credentials were presented but rejected
    Unauthenticated(String),
}
