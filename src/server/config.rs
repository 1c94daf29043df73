use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::anomaly::config::AnomalyConfig;
use super::audit::config::AuditConfig;
use super::authn::config::AuthnConfig;
use super::authz::config::AuthzConfig;
use super::db::config::DbConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default = "ServerConfig::default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "ServerConfig::default_workers")]
    pub workers: u64,

    #[serde(default = "ServerConfig::default_payload_limit_mib")]
    pub payload_limit_mib: usize,

    #[serde(default = "ServerConfig::default_log_level")]
    pub log_level: String,

    #[serde(default = "AuthnConfig::default")]
    pub authn: AuthnConfig,

    #[serde(default = "AuthzConfig::default")]
    pub authz: AuthzConfig,

    #[serde(default = "AnomalyConfig::default")]
    pub anomaly: AnomalyConfig,

    #[serde(default = "AuditConfig::default")]
    pub audit: AuditConfig,

    #[serde(default = "DbConfig::default")]
    pub db: DbConfig,
}

impl CommonConfig for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            keep_alive_secs: Self::default_keep_alive_secs(),
            workers: Self::default_workers(),
            payload_limit_mib: Self::default_payload_limit_mib(),
            log_level: Self::default_log_level(),
            authn: AuthnConfig::default(),
            authz: AuthzConfig::default(),
            anomaly: AnomalyConfig::default(),
            audit: AuditConfig::default(),
            db: DbConfig::default(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind cannot be empty");
        }

        if self.payload_limit_mib < Self::MIN_PAYLOAD_LIMIT_MIB {
            bail!(
                "payload_limit_mib must be greater than or equal to {}",
                Self::MIN_PAYLOAD_LIMIT_MIB
            );
        }
        if self.payload_limit_mib > Self::MAX_PAYLOAD_LIMIT_MIB {
            bail!(
                "payload_limit_mib must be less than or equal to {}",
                Self::MAX_PAYLOAD_LIMIT_MIB
            );
        }

        if !matches!(
            self.log_level.as_str(),
            "error" | "warn" | "warning" | "info" | "debug"
        ) {
            bail!("unknown log_level '{}'", self.log_level);
        }

        self.authn.complete(ps).context("authn")?;
        self.authz.complete(ps).context("authz")?;
        self.anomaly.complete(ps).context("anomaly")?;
        self.audit.complete(ps).context("audit")?;
        self.db.complete(ps).context("db")?;

        Ok(())
    }
}

impl ServerConfig {
    const MAX_PAYLOAD_LIMIT_MIB: usize = 10;
    const MIN_PAYLOAD_LIMIT_MIB: usize = 1;

    pub fn default_bind() -> String {
        String::from("127.0.0.1:7880")
    }

    pub fn default_keep_alive_secs() -> u64 {
        60
    }

    pub fn default_workers() -> u64 {
        0
    }

    pub fn default_payload_limit_mib() -> usize {
        2
    }

    pub fn default_log_level() -> String {
        String::from("info")
    }
}
