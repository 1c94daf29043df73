use actix_web::HttpRequest;
use anyhow::{bail, Result};
use chrono::Local;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::identity::{IdentityContext, Role, Verification};

use super::config::AuthnConfig;
use super::{Authenticator, AuthnResponse};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    pub sub: String, // Required. User identifier
    pub exp: usize,  // Required. Expiration time (timestamp)
    pub iat: usize,
    pub role: String,

    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub has_address: bool,
}

/// Issues tokens for operators and tests; production tokens come from the
/// identity provider.
pub struct JwtTokenGenerator {
    key: EncodingKey,
    expiry: usize,
}

impl JwtTokenGenerator {
    pub fn new(secret: &str, expiry: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            expiry: expiry as usize,
        }
    }

    pub fn generate_token(&self, identity: &IdentityContext) -> Result<String> {
        if identity.user_id.is_empty() {
            bail!("generate jwt token failed: empty user id");
        }

        let now = Local::now().timestamp() as usize;
        let claims = Claims {
            sub: identity.user_id.clone(),
            exp: now + self.expiry,
            iat: now,
            role: identity.role.to_string(),
            identity_verified: identity.verification.identity,
            email_verified: identity.verification.email,
            phone_verified: identity.verification.phone,
            has_address: identity.has_address,
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &self.key) {
            Ok(token) => Ok(token),
            Err(e) => bail!("generate jwt token failed: {e}"),
        }
    }
}

/// Reads `Authorization: Bearer <jwt>` and turns the claims into an
/// [`IdentityContext`].
pub struct JwtAuthenticator {
    key: DecodingKey,
    leeway: u64,
}

impl JwtAuthenticator {
    pub fn new(cfg: &AuthnConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(cfg.secret.as_bytes()),
            leeway: cfg.leeway_secs,
        }
    }

    fn validate_token(&self, token: &str) -> Result<IdentityContext> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = match decode::<Claims>(token, &self.key, &validation) {
            Ok(data) => data.claims,
            Err(e) => bail!("validate jwt token failed: {e}"),
        };

        if claims.sub.is_empty() {
            bail!("validate jwt token failed: empty subject");
        }

        Ok(IdentityContext {
            user_id: claims.sub,
            role: Role::parse(&claims.role),
            verification: Verification {
                identity: claims.identity_verified,
                email: claims.email_verified,
                phone: claims.phone_verified,
            },
            has_address: claims.has_address,
        })
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate_request(&self, req: &HttpRequest) -> Result<AuthnResponse> {
        let auth = match req.headers().get("Authorization") {
            Some(auth) => match auth.to_str() {
                Ok(auth) => auth.trim().to_string(),
                Err(_) => {
                    return Ok(AuthnResponse::Unauthenticated(String::from(
                        "invalid authorization header",
                    )))
                }
            },
            None => return Ok(AuthnResponse::Anonymous),
        };

        if auth.is_empty() {
            return Ok(AuthnResponse::Anonymous);
        }

        let mut iter = auth.split_whitespace();
        match iter.next() {
            Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {}
            _ => {
                return Ok(AuthnResponse::Unauthenticated(String::from(
                    "unsupported authorization scheme",
                )))
            }
        }

        let token = match iter.next() {
            Some(token) => token,
            None => {
                return Ok(AuthnResponse::Unauthenticated(String::from(
                    "missing bearer token",
                )))
            }
        };

        match self.validate_token(token) {
            Ok(identity) => Ok(AuthnResponse::Ok(identity)),
            Err(e) => Ok(AuthnResponse::Unauthenticated(format!("{e:#}"))),
        }
    }
}
