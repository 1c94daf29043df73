use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};
use crate::types::identity::Role;

use super::matrix::RolePermissions;

/// Authorization related configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthzConfig {
    /// Per-role overrides of the built-in permission matrix, keyed by role
    /// name. A configured role replaces the built-in entry as a whole.
    /// Defaults to empty.
    #[serde(default = "AuthzConfig::default_roles")]
    pub roles: HashMap<String, RolePermissions>,
}

impl CommonConfig for AuthzConfig {
    fn default() -> Self {
        Self {
            roles: Self::default_roles(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        for (name, perms) in self.roles.iter() {
            if matches!(Role::parse(name), Role::Unknown) {
                bail!("unknown role '{name}' in authz.roles, expect one of customer, artisan, distributor, admin");
            }
            perms
                .validate()
                .with_context(|| format!("authz.roles.{name}"))?;
        }
        Ok(())
    }
}

impl AuthzConfig {
    pub fn default_roles() -> HashMap<String, RolePermissions> {
        HashMap::new()
    }

    /// The configured overrides keyed by role. Unknown role names are skipped,
    /// [`CommonConfig::complete`] rejects them beforehand.
    pub fn role_overrides(&self) -> HashMap<Role, RolePermissions> {
        self.roles
            .iter()
            .filter_map(|(name, perms)| match Role::parse(name) {
                Role::Unknown => None,
                role => Some((role, perms.clone())),
            })
            .collect()
    }
}
