use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::types::resource::{InventoryRecord, OrderRecord, ProductRecord};

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS product (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_product_owner_id ON product(owner_id);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY NOT NULL,
    buyer_id TEXT NOT NULL,
    seller_id TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_buyer_id ON orders(buyer_id);
CREATE INDEX IF NOT EXISTS idx_orders_seller_id ON orders(seller_id);

CREATE TABLE IF NOT EXISTS inventory (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    quantity INTEGER NOT NULL
);
"#;

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES_SQL)?;
    Ok(())
}

pub fn create_product(tx: &Transaction, product: &ProductRecord) -> Result<()> {
    let sql = "INSERT INTO product (id, owner_id, name) VALUES (?, ?, ?)";
    debug!("Database create_product: {sql}, {product:?}");
    tx.execute(sql, params![product.id, product.owner_id, product.name])?;
    Ok(())
}

pub fn get_product(tx: &Transaction, id: &str) -> Result<Option<ProductRecord>> {
    let sql = "SELECT id, owner_id, name FROM product WHERE id = ?";
    debug!("Database get_product: {sql}, {id}");
    let product = tx
        .query_row(sql, params![id], |row| {
            Ok(ProductRecord {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                name: row.get(2)?,
            })
        })
        .optional()?;
    Ok(product)
}

pub fn create_order(tx: &Transaction, order: &OrderRecord) -> Result<()> {
    // `order` is a keyword in SQL, the table is named `orders`
    let sql = "INSERT INTO orders (id, buyer_id, seller_id, status) VALUES (?, ?, ?, ?)";
    debug!("Database create_order: {sql}, {order:?}");
    tx.execute(
        sql,
        params![order.id, order.buyer_id, order.seller_id, order.status],
    )?;
    Ok(())
}

pub fn get_order(tx: &Transaction, id: &str) -> Result<Option<OrderRecord>> {
    let sql = "SELECT id, buyer_id, seller_id, status FROM orders WHERE id = ?";
    debug!("Database get_order: {sql}, {id}");
    let order = tx
        .query_row(sql, params![id], |row| {
            Ok(OrderRecord {
                id: row.get(0)?,
                buyer_id: row.get(1)?,
                seller_id: row.get(2)?,
                status: row.get(3)?,
            })
        })
        .optional()?;
    Ok(order)
}

pub fn create_inventory(tx: &Transaction, inventory: &InventoryRecord) -> Result<()> {
    let sql = "INSERT INTO inventory (id, owner_id, product_id, quantity) VALUES (?, ?, ?, ?)";
    debug!("Database create_inventory: {sql}, {inventory:?}");
    tx.execute(
        sql,
        params![
            inventory.id,
            inventory.owner_id,
            inventory.product_id,
            inventory.quantity
        ],
    )?;
    Ok(())
}

pub fn get_inventory(tx: &Transaction, id: &str) -> Result<Option<InventoryRecord>> {
    let sql = "SELECT id, owner_id, product_id, quantity FROM inventory WHERE id = ?";
    debug!("Database get_inventory: {sql}, {id}");
    let inventory = tx
        .query_row(sql, params![id], |row| {
            Ok(InventoryRecord {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                product_id: row.get(2)?,
                quantity: row.get(3)?,
            })
        })
        .optional()?;
    Ok(inventory)
}
