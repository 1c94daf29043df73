use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::types::identity::Role;
use crate::types::resource::ResourceType;

use super::Action;

pub const WILDCARD: &str = "*";

/// Permissions of one role. Each `can_*` set holds resource type names or the
/// wildcard `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    #[serde(default)]
    pub can_read: HashSet<String>,
    #[serde(default)]
    pub can_create: HashSet<String>,
    #[serde(default)]
    pub can_update: HashSet<String>,
    #[serde(default)]
    pub can_delete: HashSet<String>,
    #[serde(default)]
    pub can_search: HashSet<String>,

    #[serde(default)]
    pub restrictions: Restrictions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default)]
    pub requires_identity_verification: HashSet<ResourceType>,
    #[serde(default)]
    pub requires_address: HashSet<ResourceType>,
    #[serde(default)]
    pub own_resources_only: HashSet<ResourceType>,
}

impl RolePermissions {
    fn new(
        read: &[ResourceType],
        create: &[ResourceType],
        update: &[ResourceType],
        delete: &[ResourceType],
        search: &[ResourceType],
    ) -> Self {
        let names = |kinds: &[ResourceType]| -> HashSet<String> {
            kinds.iter().map(|kind| kind.as_str().to_string()).collect()
        };
        Self {
            can_read: names(read),
            can_create: names(create),
            can_update: names(update),
            can_delete: names(delete),
            can_search: names(search),
            restrictions: Restrictions::default(),
        }
    }

    fn wildcard() -> Self {
        let all: HashSet<String> = [WILDCARD.to_string()].into_iter().collect();
        Self {
            can_read: all.clone(),
            can_create: all.clone(),
            can_update: all.clone(),
            can_delete: all.clone(),
            can_search: all,
            restrictions: Restrictions::default(),
        }
    }

    pub fn selectors(&self, action: Action) -> &HashSet<String> {
        match action {
            Action::Read => &self.can_read,
            Action::Create => &self.can_create,
            Action::Update => &self.can_update,
            Action::Delete => &self.can_delete,
            Action::Search => &self.can_search,
        }
    }

    pub fn allows(&self, action: Action, kind: ResourceType) -> bool {
        let selectors = self.selectors(action);
        selectors.contains(WILDCARD) || selectors.contains(kind.as_str())
    }

    /// Every selector must be the wildcard or a resource type name in its
    /// singular form.
    pub fn validate(&self) -> Result<()> {
        for action in [
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Search,
        ] {
            for selector in self.selectors(action) {
                if selector == WILDCARD {
                    continue;
                }
                if !ResourceType::ALL.iter().any(|kind| kind.as_str() == selector) {
                    bail!("unknown resource type '{selector}' in can_{action}");
                }
            }
        }
        Ok(())
    }
}

/// Role to permissions table. Built once at start-up and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    roles: HashMap<Role, RolePermissions>,
}

impl PermissionMatrix {
    pub fn new(roles: HashMap<Role, RolePermissions>) -> Self {
        Self { roles }
    }

    /// The built-in marketplace table.
    pub fn defaults() -> Self {
        use ResourceType::*;

        let mut customer = RolePermissions::new(
            &[Product, Order, Address, User, Artisan, Distributor],
            &[Order, Address],
            &[Order, Address, User],
            &[Address],
            &[Product, Artisan],
        );
        customer.restrictions.requires_address = [Order].into_iter().collect();
        customer.restrictions.own_resources_only = [Order, Address, User].into_iter().collect();

        let mut artisan = RolePermissions::new(
            &[Product, Order, Inventory, User, Artisan, Address],
            &[Product, Inventory],
            &[Product, Inventory, Order, Artisan, User],
            &[Product, Inventory],
            &[Product, Order, Inventory],
        );
        artisan.restrictions.requires_identity_verification =
            [Product, Inventory].into_iter().collect();
        artisan.restrictions.own_resources_only =
            [Product, Inventory, Order, Artisan, User, Address].into_iter().collect();

        let mut distributor = RolePermissions::new(
            &[Product, Order, Inventory, Distributor, User, Artisan],
            &[Order, Inventory],
            &[Order, Inventory, Distributor, User],
            &[Inventory],
            &[Product, Order, Inventory, Artisan],
        );
        distributor.restrictions.requires_identity_verification =
            [Inventory].into_iter().collect();
        distributor.restrictions.requires_address = [Order].into_iter().collect();
        distributor.restrictions.own_resources_only =
            [Order, Inventory, Distributor, User].into_iter().collect();

        let mut roles = HashMap::with_capacity(4);
        roles.insert(Role::Customer, customer);
        roles.insert(Role::Artisan, artisan);
        roles.insert(Role::Distributor, distributor);
        roles.insert(Role::Admin, RolePermissions::wildcard());
        Self { roles }
    }

    /// Replaces whole role entries with the configured ones.
    pub fn with_overrides(mut self, overrides: HashMap<Role, RolePermissions>) -> Self {
        self.roles.extend(overrides);
        self
    }

    pub fn get(&self, role: Role) -> Option<&RolePermissions> {
        self.roles.get(&role)
    }
}
