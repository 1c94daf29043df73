use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::types::identity::IdentityContext;
use crate::types::resource::{Resource, ResourceType};

use super::db::{Database, Transaction};

/// Resolves one resource instance by id. `Ok(None)` means the resource does not
/// exist; `Err` is reserved for I/O faults.
pub trait ResourceLookup: Send + Sync {
    fn lookup(&self, id: &str) -> Result<Option<Resource>>;
}

impl<F> ResourceLookup for F
where
    F: Fn(&str) -> Result<Option<Resource>> + Send + Sync,
{
    fn lookup(&self, id: &str) -> Result<Option<Resource>> {
        self(id)
    }
}

/// Decides whether the caller owns a resolved resource.
pub type OwnershipPredicate = fn(&Resource, &IdentityContext) -> bool;

struct LookupEntry {
    lookup: Box<dyn ResourceLookup>,
    owner: OwnershipPredicate,
}

/// Registry from resource type to its lookup function and ownership predicate,
/// populated once at start-up.
#[derive(Default)]
pub struct LookupRegistry {
    entries: HashMap<ResourceType, LookupEntry>,
}

impl LookupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every resource type against the database, each with its
    /// default ownership predicate.
    pub fn with_database(db: Arc<Database>) -> Self {
        let mut registry = Self::new();
        for kind in ResourceType::ALL {
            let lookup = DbLookup {
                db: db.clone(),
                kind,
            };
            registry.register(kind, lookup, default_owner(kind));
        }
        registry
    }

    /// Registers (or replaces) the lookup for `kind`.
    pub fn register<L>(&mut self, kind: ResourceType, lookup: L, owner: OwnershipPredicate)
    where
        L: ResourceLookup + 'static,
    {
        self.entries.insert(
            kind,
            LookupEntry {
                lookup: Box::new(lookup),
                owner,
            },
        );
    }

    pub fn is_registered(&self, kind: ResourceType) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Resolves a resource. An unregistered type is reported as not found.
    pub fn resolve(&self, kind: ResourceType, id: &str) -> Result<Option<Resource>> {
        match self.entries.get(&kind) {
            Some(entry) => entry.lookup.lookup(id),
            None => Ok(None),
        }
    }

    /// Runs the ownership predicate registered for the resource's type.
    /// A resource of an unregistered type is never owned.
    pub fn owns(&self, resource: &Resource, identity: &IdentityContext) -> bool {
        match self.entries.get(&resource.kind()) {
            Some(entry) => (entry.owner)(resource, identity),
            None => false,
        }
    }
}

pub fn default_owner(kind: ResourceType) -> OwnershipPredicate {
    match kind {
        ResourceType::User => owns_user,
        ResourceType::Artisan => owns_artisan,
        ResourceType::Distributor => owns_distributor,
        ResourceType::Product => owns_product,
        ResourceType::Order => owns_order,
        ResourceType::Address => owns_address,
        ResourceType::Inventory => owns_inventory,
    }
}

fn owns_user(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::User(user) if user.id == identity.user_id)
}

fn owns_artisan(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::Artisan(artisan) if artisan.user_id == identity.user_id)
}

fn owns_distributor(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::Distributor(d) if d.user_id == identity.user_id)
}

fn owns_product(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::Product(product) if product.owner_id == identity.user_id)
}

/// Both parties of an order may act on it.
fn owns_order(resource: &Resource, identity: &IdentityContext) -> bool {
    match resource {
        Resource::Order(order) => {
            order.buyer_id == identity.user_id || order.seller_id == identity.user_id
        }
        _ => false,
    }
}

fn owns_address(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::Address(address) if address.user_id == identity.user_id)
}

fn owns_inventory(resource: &Resource, identity: &IdentityContext) -> bool {
    matches!(resource, Resource::Inventory(inv) if inv.owner_id == identity.user_id)
}

struct DbLookup {
    db: Arc<Database>,
    kind: ResourceType,
}

impl ResourceLookup for DbLookup {
    fn lookup(&self, id: &str) -> Result<Option<Resource>> {
        self.db.with_transaction(|tx| get_resource(tx, self.kind, id))
    }
}

fn get_resource(tx: &dyn Transaction, kind: ResourceType, id: &str) -> Result<Option<Resource>> {
    let resource = match kind {
        ResourceType::User => tx.get_user(id)?.map(Resource::User),
        ResourceType::Artisan => tx.get_artisan(id)?.map(Resource::Artisan),
        ResourceType::Distributor => tx.get_distributor(id)?.map(Resource::Distributor),
        ResourceType::Product => tx.get_product(id)?.map(Resource::Product),
        ResourceType::Order => tx.get_order(id)?.map(Resource::Order),
        ResourceType::Address => tx.get_address(id)?.map(Resource::Address),
        ResourceType::Inventory => tx.get_inventory(id)?.map(Resource::Inventory),
    };
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::types::identity::Role;
    use crate::types::resource::{AddressRecord, OrderRecord, ProductRecord};

    use super::*;

    fn order(buyer: &str, seller: &str) -> Resource {
        Resource::Order(OrderRecord {
            id: "o1".to_string(),
            buyer_id: buyer.to_string(),
            seller_id: seller.to_string(),
            status: "pending".to_string(),
        })
    }

    #[test]
    fn test_default_owners() {
        let alice = IdentityContext::new("alice", Role::Customer);
        let registry = LookupRegistry::with_database(Arc::new(Database::new_test().unwrap()));

        assert!(registry.owns(&order("alice", "bob"), &alice));
        assert!(registry.owns(&order("bob", "alice"), &alice));
        assert!(!registry.owns(&order("bob", "carol"), &alice));

        let product = Resource::Product(ProductRecord {
            id: "p1".to_string(),
            owner_id: "bob".to_string(),
            name: "Vase".to_string(),
        });
        assert!(!registry.owns(&product, &alice));

        let address = Resource::Address(AddressRecord {
            id: "a1".to_string(),
            user_id: "alice".to_string(),
            line: "1 Market St".to_string(),
        });
        assert!(registry.owns(&address, &alice));
    }

    #[test]
    fn test_resolve_from_database() {
        let db = Arc::new(Database::new_test().unwrap());
        db.with_transaction(|tx| {
            tx.create_order(&OrderRecord {
                id: "123".to_string(),
                buyer_id: "u1".to_string(),
                seller_id: "u2".to_string(),
                status: "paid".to_string(),
            })
        })
        .unwrap();

        let registry = LookupRegistry::with_database(db);
        let resource = registry.resolve(ResourceType::Order, "123").unwrap();
        assert_eq!(resource.unwrap().id(), "123");
        assert!(registry.resolve(ResourceType::Order, "404").unwrap().is_none());
        assert!(registry.resolve(ResourceType::Product, "123").unwrap().is_none());
    }

    #[test]
    fn test_register_closure() {
        let mut registry = LookupRegistry::new();
        assert!(!registry.is_registered(ResourceType::Order));
        assert!(registry.resolve(ResourceType::Order, "1").unwrap().is_none());

        registry.register(
            ResourceType::Order,
            |id: &str| -> Result<Option<Resource>> {
                if id == "broken" {
                    bail!("connection reset");
                }
                Ok(Some(order("u1", "u2")))
            },
            default_owner(ResourceType::Order),
        );
        assert!(registry.is_registered(ResourceType::Order));
        assert!(registry.resolve(ResourceType::Order, "1").unwrap().is_some());
        assert!(registry.resolve(ResourceType::Order, "broken").is_err());
    }
}
