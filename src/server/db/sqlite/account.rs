use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::types::resource::{AddressRecord, ArtisanRecord, DistributorRecord, UserRecord};

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS address (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    line TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_address_user_id ON address(user_id);

CREATE TABLE IF NOT EXISTS artisan (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    shop_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS distributor (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    company TEXT NOT NULL
);
"#;

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES_SQL)?;
    Ok(())
}

pub fn create_user(tx: &Transaction, user: &UserRecord) -> Result<()> {
    let sql = "INSERT INTO user (id, name) VALUES (?, ?)";
    debug!("Database create_user: {sql}, {user:?}");
    tx.execute(sql, params![user.id, user.name])?;
    Ok(())
}

pub fn get_user(tx: &Transaction, id: &str) -> Result<Option<UserRecord>> {
    let sql = "SELECT id, name FROM user WHERE id = ?";
    debug!("Database get_user: {sql}, {id}");
    let user = tx
        .query_row(sql, params![id], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()?;
    Ok(user)
}

pub fn create_address(tx: &Transaction, address: &AddressRecord) -> Result<()> {
    let sql = "INSERT INTO address (id, user_id, line) VALUES (?, ?, ?)";
    debug!("Database create_address: {sql}, {address:?}");
    tx.execute(sql, params![address.id, address.user_id, address.line])?;
    Ok(())
}

pub fn get_address(tx: &Transaction, id: &str) -> Result<Option<AddressRecord>> {
    let sql = "SELECT id, user_id, line FROM address WHERE id = ?";
    debug!("Database get_address: {sql}, {id}");
    let address = tx
        .query_row(sql, params![id], |row| {
            Ok(AddressRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                line: row.get(2)?,
            })
        })
        .optional()?;
    Ok(address)
}

pub fn create_artisan(tx: &Transaction, artisan: &ArtisanRecord) -> Result<()> {
    let sql = "INSERT INTO artisan (id, user_id, shop_name) VALUES (?, ?, ?)";
    debug!("Database create_artisan: {sql}, {artisan:?}");
    tx.execute(
        sql,
        params![artisan.id, artisan.user_id, artisan.shop_name],
    )?;
    Ok(())
}

pub fn get_artisan(tx: &Transaction, id: &str) -> Result<Option<ArtisanRecord>> {
    let sql = "SELECT id, user_id, shop_name FROM artisan WHERE id = ?";
    debug!("Database get_artisan: {sql}, {id}");
    let artisan = tx
        .query_row(sql, params![id], |row| {
            Ok(ArtisanRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                shop_name: row.get(2)?,
            })
        })
        .optional()?;
    Ok(artisan)
}

pub fn create_distributor(tx: &Transaction, distributor: &DistributorRecord) -> Result<()> {
    let sql = "INSERT INTO distributor (id, user_id, company) VALUES (?, ?, ?)";
    debug!("Database create_distributor: {sql}, {distributor:?}");
    tx.execute(
        sql,
        params![distributor.id, distributor.user_id, distributor.company],
    )?;
    Ok(())
}

pub fn get_distributor(tx: &Transaction, id: &str) -> Result<Option<DistributorRecord>> {
    let sql = "SELECT id, user_id, company FROM distributor WHERE id = ?";
    debug!("Database get_distributor: {sql}, {id}");
    let distributor = tx
        .query_row(sql, params![id], |row| {
            Ok(DistributorRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                company: row.get(2)?,
            })
        })
        .optional()?;
    Ok(distributor)
}
