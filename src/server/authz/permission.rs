use std::sync::Arc;

use crate::server::error::GuardError;
use crate::types::identity::{IdentityContext, Role};
use crate::types::resource::ResourceType;

use super::matrix::PermissionMatrix;
use super::{Action, AuthzResponse};

/// Table-driven role, action and resource type check.
pub struct PermissionEvaluator {
    matrix: Arc<PermissionMatrix>,
}

impl PermissionEvaluator {
    pub fn new(matrix: Arc<PermissionMatrix>) -> Self {
        Self { matrix }
    }

    /// Evaluation order:
    /// 1. A role without a matrix entry is denied with `INVALID_ROLE`.
    /// 2. Admin is always allowed.
    /// 3. The action must be granted for the type, else `INSUFFICIENT_PERMISSIONS`.
    /// 4. Restrictions, first failure wins: identity verification, then address.
    pub fn check_permission(
        &self,
        action: Action,
        kind: ResourceType,
        identity: &IdentityContext,
    ) -> AuthzResponse {
        let perms = match self.matrix.get(identity.role) {
            Some(perms) => perms,
            None => return AuthzResponse::Deny(GuardError::InvalidRole),
        };

        if matches!(identity.role, Role::Admin) {
            return AuthzResponse::Allow;
        }

        if !perms.allows(action, kind) {
            return AuthzResponse::Deny(GuardError::InsufficientPermission);
        }

        let restrictions = &perms.restrictions;
        if restrictions.requires_identity_verification.contains(&kind)
            && !identity.verification.identity
        {
            return AuthzResponse::Deny(GuardError::IdentityVerificationRequired);
        }
        if restrictions.requires_address.contains(&kind) && !identity.has_address {
            return AuthzResponse::Deny(GuardError::AddressRequired);
        }

        AuthzResponse::Allow
    }

    /// Whether the caller may only touch instances of `kind` it owns. Always
    /// false for admin.
    pub fn requires_ownership(&self, kind: ResourceType, identity: &IdentityContext) -> bool {
        if identity.is_admin() {
            return false;
        }
        match self.matrix.get(identity.role) {
            Some(perms) => perms.restrictions.own_resources_only.contains(&kind),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::identity::Verification;

    use super::*;

    const ACTIONS: [Action; 5] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Search,
    ];

    fn evaluator() -> PermissionEvaluator {
        PermissionEvaluator::new(Arc::new(PermissionMatrix::defaults()))
    }

    #[test]
    fn test_admin_always_allowed() {
        let evaluator = evaluator();
        let admin = IdentityContext::new("root", Role::Admin);
        for action in ACTIONS {
            for kind in ResourceType::ALL {
                assert_eq!(
                    evaluator.check_permission(action, kind, &admin),
                    AuthzResponse::Allow
                );
                assert!(!evaluator.requires_ownership(kind, &admin));
            }
        }
    }

    #[test]
    fn test_unknown_role() {
        let evaluator = evaluator();
        let caller = IdentityContext::new("u1", Role::Unknown);
        assert_eq!(
            evaluator.check_permission(Action::Read, ResourceType::Product, &caller),
            AuthzResponse::Deny(GuardError::InvalidRole)
        );
        assert!(!evaluator.requires_ownership(ResourceType::Product, &caller));
    }

    #[test]
    fn test_absent_from_matrix() {
        let matrix = PermissionMatrix::defaults();
        let evaluator = evaluator();
        for role in [Role::Customer, Role::Artisan, Role::Distributor] {
            let mut caller = IdentityContext::new("u1", role);
            caller.verification.identity = true;
            caller.has_address = true;
            let perms = matrix.get(role).unwrap();
            for action in ACTIONS {
                for kind in ResourceType::ALL {
                    let expect = if perms.allows(action, kind) {
                        AuthzResponse::Allow
                    } else {
                        AuthzResponse::Deny(GuardError::InsufficientPermission)
                    };
                    assert_eq!(evaluator.check_permission(action, kind, &caller), expect);
                }
            }
        }
    }

    #[test]
    fn test_restrictions() {
        let evaluator = evaluator();

        let artisan = IdentityContext::new("u2", Role::Artisan);
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Product, &artisan),
            AuthzResponse::Deny(GuardError::IdentityVerificationRequired)
        );
        // Restrictions only apply once the base permission passed
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Order, &artisan),
            AuthzResponse::Deny(GuardError::InsufficientPermission)
        );

        let customer = IdentityContext::new("u1", Role::Customer);
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Order, &customer),
            AuthzResponse::Deny(GuardError::AddressRequired)
        );
        assert_eq!(
            evaluator.check_permission(Action::Read, ResourceType::Product, &customer),
            AuthzResponse::Allow
        );

        // Identity verification is checked before address
        let distributor = IdentityContext::new("u3", Role::Distributor);
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Inventory, &distributor),
            AuthzResponse::Deny(GuardError::IdentityVerificationRequired)
        );
        let verified = IdentityContext {
            verification: Verification {
                identity: true,
                ..Default::default()
            },
            ..distributor
        };
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Order, &verified),
            AuthzResponse::Deny(GuardError::AddressRequired)
        );
        assert_eq!(
            evaluator.check_permission(Action::Create, ResourceType::Inventory, &verified),
            AuthzResponse::Allow
        );
    }

    #[test]
    fn test_requires_ownership() {
        let evaluator = evaluator();
        let customer = IdentityContext::new("u1", Role::Customer);
        assert!(evaluator.requires_ownership(ResourceType::Order, &customer));
        assert!(!evaluator.requires_ownership(ResourceType::Product, &customer));
    }
}
