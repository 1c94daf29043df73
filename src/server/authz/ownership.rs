use std::sync::Arc;

use anyhow::{Context, Result};

use crate::server::context::DecisionContext;
use crate::server::lookup::LookupRegistry;
use crate::types::identity::IdentityContext;
use crate::types::resource::{ResourceRef, ResourceType};

/// Result of an ownership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Allow,
    Deny { reason: String },
    NotFound,
}

/// Decides whether the caller owns or may act on one resource instance, using
/// the per-type predicates of the lookup registry.
pub struct OwnershipValidator {
    registry: Arc<LookupRegistry>,
}

impl OwnershipValidator {
    pub fn new(registry: Arc<LookupRegistry>) -> Self {
        Self { registry }
    }

    /// Admin is allowed without a lookup. On allow the resolved resource is
    /// attached to `ctx`; on deny a warning is recorded as the request's
    /// security violation. `Err` means the lookup itself failed.
    pub fn validate_ownership(
        &self,
        kind: ResourceType,
        id: &str,
        identity: &IdentityContext,
        ctx: &mut DecisionContext,
    ) -> Result<Ownership> {
        if identity.is_admin() {
            return Ok(Ownership::Allow);
        }

        let resource = self
            .registry
            .resolve(kind, id)
            .with_context(|| format!("lookup {kind} '{id}'"))?;
        let resource = match resource {
            Some(resource) => resource,
            None => return Ok(Ownership::NotFound),
        };

        if !self.registry.owns(&resource, identity) {
            let target = ResourceRef {
                kind,
                id: id.to_string(),
            };
            let reason = format!(
                "Unauthorized {kind} access attempt by user {} on {target}",
                identity.user_id
            );
            ctx.flag_violation(reason.clone());
            return Ok(Ownership::Deny { reason });
        }

        ctx.attach_resource(resource);
        Ok(Ownership::Allow)
    }
}
