mod account;
mod commerce;

pub mod config;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::types::resource::{
    AddressRecord, ArtisanRecord, DistributorRecord, InventoryRecord, OrderRecord, ProductRecord,
    UserRecord,
};

use super::Transaction;

/// SQLite-based store, file-backed or in-memory.
pub struct SqliteConnection {
    conn: RawConnection,
}

pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl SqliteConnection {
    /// Opens a SQLite database file, creating it and its tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn transaction(&mut self) -> Result<SqliteTransaction<'_>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }

    fn init_tables(conn: &RawConnection) -> Result<()> {
        account::create_tables(conn)?;
        commerce::create_tables(conn)?;
        Ok(())
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        account::create_user(&self.tx, user)
    }

    fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        account::get_user(&self.tx, id)
    }

    fn create_address(&self, address: &AddressRecord) -> Result<()> {
        account::create_address(&self.tx, address)
    }

    fn get_address(&self, id: &str) -> Result<Option<AddressRecord>> {
        account::get_address(&self.tx, id)
    }

    fn create_artisan(&self, artisan: &ArtisanRecord) -> Result<()> {
        account::create_artisan(&self.tx, artisan)
    }

    fn get_artisan(&self, id: &str) -> Result<Option<ArtisanRecord>> {
        account::get_artisan(&self.tx, id)
    }

    fn create_distributor(&self, distributor: &DistributorRecord) -> Result<()> {
        account::create_distributor(&self.tx, distributor)
    }

    fn get_distributor(&self, id: &str) -> Result<Option<DistributorRecord>> {
        account::get_distributor(&self.tx, id)
    }

    fn create_product(&self, product: &ProductRecord) -> Result<()> {
        commerce::create_product(&self.tx, product)
    }

    fn get_product(&self, id: &str) -> Result<Option<ProductRecord>> {
        commerce::get_product(&self.tx, id)
    }

    fn create_order(&self, order: &OrderRecord) -> Result<()> {
        commerce::create_order(&self.tx, order)
    }

    fn get_order(&self, id: &str) -> Result<Option<OrderRecord>> {
        commerce::get_order(&self.tx, id)
    }

    fn create_inventory(&self, inventory: &InventoryRecord) -> Result<()> {
        commerce::create_inventory(&self.tx, inventory)
    }

    fn get_inventory(&self, id: &str) -> Result<Option<InventoryRecord>> {
        commerce::get_inventory(&self.tx, id)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
