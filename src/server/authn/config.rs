use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

/// Bearer token settings. Tokens are HS256 JWTs issued by the identity
/// provider with the same shared secret.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthnConfig {
    #[serde(default = "AuthnConfig::default_secret")]
    pub secret: String,

    /// Clock skew tolerated when checking `exp`, in seconds.
    #[serde(default = "AuthnConfig::default_leeway_secs")]
    pub leeway_secs: u64,
}

impl CommonConfig for AuthnConfig {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
            leeway_secs: Self::default_leeway_secs(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        self.secret = expandenv("secret", &self.secret)?;
        if self.secret.is_empty() {
            bail!("secret cannot be empty");
        }
        if self.secret == Self::default_secret() {
            warn!("Using the built-in token secret. THIS IS DANGEROUS, DO NOT USE IN PRODUCTION");
        }

        if self.leeway_secs > Self::MAX_LEEWAY_SECS {
            bail!(
                "leeway_secs must be less than or equal to {}",
                Self::MAX_LEEWAY_SECS
            );
        }

        Ok(())
    }
}

impl AuthnConfig {
    const MAX_LEEWAY_SECS: u64 = 300;

    pub fn default_secret() -> String {
        String::from("gatekeep_secret_123")
    }

    pub fn default_leeway_secs() -> u64 {
        30
    }
}
