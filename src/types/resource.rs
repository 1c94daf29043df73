use std::fmt::Display;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    User,
    Artisan,
    Distributor,
    Product,
    Order,
    Address,
    Inventory,
}

impl ResourceType {
    pub const ALL: [ResourceType; 7] = [
        ResourceType::User,
        ResourceType::Artisan,
        ResourceType::Distributor,
        ResourceType::Product,
        ResourceType::Order,
        ResourceType::Address,
        ResourceType::Inventory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Artisan => "artisan",
            Self::Distributor => "distributor",
            Self::Product => "product",
            Self::Order => "order",
            Self::Address => "address",
            Self::Inventory => "inventory",
        }
    }

    /// Accepts both singular and plural path forms, e.g. `order` and `orders`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.to_lowercase();
        let name = match s.as_str() {
            "addresses" => "address",
            "inventories" => "inventory",
            other => other.strip_suffix('s').unwrap_or(other),
        };
        for kind in Self::ALL {
            if kind.as_str() == name || kind.as_str() == s {
                return Ok(kind);
            }
        }
        bail!("unknown resource type '{s}'")
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names one resource instance for a single ownership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceType,
    pub id: String,
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: String,
    pub user_id: String,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtisanRecord {
    pub id: String,
    pub user_id: String,
    pub shop_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorRecord {
    pub id: String,
    pub user_id: String,
    pub company: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    /// User id of the artisan selling this product.
    pub owner_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    pub owner_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// A resolved resource instance, carrying the owning-identity fields its type
/// needs for an ownership decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Resource {
    User(UserRecord),
    Artisan(ArtisanRecord),
    Distributor(DistributorRecord),
    Product(ProductRecord),
    Order(OrderRecord),
    Address(AddressRecord),
    Inventory(InventoryRecord),
}

impl Resource {
    pub fn kind(&self) -> ResourceType {
        match self {
            Self::User(_) => ResourceType::User,
            Self::Artisan(_) => ResourceType::Artisan,
            Self::Distributor(_) => ResourceType::Distributor,
            Self::Product(_) => ResourceType::Product,
            Self::Order(_) => ResourceType::Order,
            Self::Address(_) => ResourceType::Address,
            Self::Inventory(_) => ResourceType::Inventory,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(r) => &r.id,
            Self::Artisan(r) => &r.id,
            Self::Distributor(r) => &r.id,
            Self::Product(r) => &r.id,
            Self::Order(r) => &r.id,
            Self::Address(r) => &r.id,
            Self::Inventory(r) => &r.id,
        }
    }
}
