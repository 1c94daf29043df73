mod sqlite;

pub mod config;

use std::cell::RefCell;
use std::sync::Mutex;

use anyhow::{bail, Result};
use sqlite::SqliteConnection;

use crate::types::resource::{
    AddressRecord, ArtisanRecord, DistributorRecord, InventoryRecord, OrderRecord, ProductRecord,
    UserRecord,
};

pub use sqlite::config::SqliteConfig;

/// Operations on the marketplace records the lookup registry resolves. Getters
/// return `None` when the row does not exist.
pub trait Transaction {
    fn create_user(&self, user: &UserRecord) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    fn create_address(&self, address: &AddressRecord) -> Result<()>;
    fn get_address(&self, id: &str) -> Result<Option<AddressRecord>>;

    fn create_artisan(&self, artisan: &ArtisanRecord) -> Result<()>;
    fn get_artisan(&self, id: &str) -> Result<Option<ArtisanRecord>>;

    fn create_distributor(&self, distributor: &DistributorRecord) -> Result<()>;
    fn get_distributor(&self, id: &str) -> Result<Option<DistributorRecord>>;

    fn create_product(&self, product: &ProductRecord) -> Result<()>;
    fn get_product(&self, id: &str) -> Result<Option<ProductRecord>>;

    fn create_order(&self, order: &OrderRecord) -> Result<()>;
    fn get_order(&self, id: &str) -> Result<Option<OrderRecord>>;

    fn create_inventory(&self, inventory: &InventoryRecord) -> Result<()>;
    fn get_inventory(&self, id: &str) -> Result<Option<InventoryRecord>>;

    fn commit(self) -> Result<()>
    where
        Self: Sized;
    fn rollback(self) -> Result<()>
    where
        Self: Sized;
}

pub struct Database {
    conn: Mutex<RefCell<SqliteConnection>>,
}

impl Database {
    pub fn new(cfg: &SqliteConfig) -> Result<Self> {
        let conn = cfg.build()?;
        Ok(Self {
            conn: Mutex::new(RefCell::new(conn)),
        })
    }

    /// In-memory database, for tests and demos.
    pub fn new_test() -> Result<Self> {
        let conn = SqliteConnection::memory()?;
        Ok(Self {
            conn: Mutex::new(RefCell::new(conn)),
        })
    }

    /// Runs `f` inside one transaction. The transaction is committed when `f`
    /// succeeds and rolled back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock connection: {:#}", e),
        };
        let mut conn = conn.borrow_mut();
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(id: &str) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            buyer_id: "u1".to_string(),
            seller_id: "u2".to_string(),
            status: "pending".to_string(),
        }
    }

    #[test]
    fn test_records() {
        let db = Database::new_test().unwrap();
        db.with_transaction(|tx| {
            tx.create_user(&UserRecord {
                id: "u1".to_string(),
                name: "Alice".to_string(),
            })?;
            tx.create_address(&AddressRecord {
                id: "a1".to_string(),
                user_id: "u1".to_string(),
                line: "1 Market St".to_string(),
            })?;
            tx.create_artisan(&ArtisanRecord {
                id: "ar1".to_string(),
                user_id: "u2".to_string(),
                shop_name: "Clay Works".to_string(),
            })?;
            tx.create_distributor(&DistributorRecord {
                id: "d1".to_string(),
                user_id: "u3".to_string(),
                company: "Freight Co".to_string(),
            })?;
            tx.create_product(&ProductRecord {
                id: "p1".to_string(),
                owner_id: "u2".to_string(),
                name: "Vase".to_string(),
            })?;
            tx.create_order(&new_order("o1"))?;
            tx.create_inventory(&InventoryRecord {
                id: "i1".to_string(),
                owner_id: "u3".to_string(),
                product_id: "p1".to_string(),
                quantity: 12,
            })?;
            Ok(())
        })
        .unwrap();

        db.with_transaction(|tx| {
            assert_eq!(tx.get_user("u1")?.unwrap().name, "Alice");
            assert_eq!(tx.get_address("a1")?.unwrap().user_id, "u1");
            assert_eq!(tx.get_artisan("ar1")?.unwrap().user_id, "u2");
            assert_eq!(tx.get_distributor("d1")?.unwrap().company, "Freight Co");
            assert_eq!(tx.get_product("p1")?.unwrap().owner_id, "u2");
            assert_eq!(tx.get_order("o1")?.unwrap(), new_order("o1"));
            assert_eq!(tx.get_inventory("i1")?.unwrap().quantity, 12);

            assert!(tx.get_user("missing")?.is_none());
            assert!(tx.get_order("missing")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rollback() {
        let db = Database::new_test().unwrap();
        let result: Result<()> = db.with_transaction(|tx| {
            tx.create_order(&new_order("o2"))?;
            bail!("rollback");
        });
        assert!(result.is_err());

        db.with_transaction(|tx| {
            assert!(tx.get_order("o2")?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
