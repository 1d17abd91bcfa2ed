//! Cart tables: carts and the active-cart index

use crate::db::{
    ACTIVE_CARTS_TABLE, CART_ID_KEY, CARTS_TABLE, CommerceDb, StorageResult, decode, encode,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::AbandonedCart;

#[derive(Debug, Clone)]
pub struct CartStorage {
    db: CommerceDb,
}

impl CartStorage {
    pub fn new(db: CommerceDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CommerceDb {
        &self.db
    }

    pub fn next_cart_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.db.next_value(txn, CART_ID_KEY)
    }

    pub fn get_cart(&self, cart_id: u64) -> StorageResult<Option<AbandonedCart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        match table.get(cart_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a cart by ID (within transaction)
    pub fn get_cart_txn(
        &self,
        txn: &WriteTransaction,
        cart_id: u64,
    ) -> StorageResult<Option<AbandonedCart>> {
        let table = txn.open_table(CARTS_TABLE)?;

        match table.get(cart_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_cart(&self, txn: &WriteTransaction, cart: &AbandonedCart) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        let value = encode(cart)?;
        table.insert(cart.id, value.as_slice())?;
        Ok(())
    }

    pub fn all_carts(&self) -> StorageResult<Vec<AbandonedCart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        let mut carts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            carts.push(decode(value.value())?);
        }
        Ok(carts)
    }

    // ========== Active cart index ==========

    pub fn active_cart_id(&self, email: &str) -> StorageResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_CARTS_TABLE)?;
        Ok(table.get(email)?.map(|guard| guard.value()))
    }

    pub fn active_cart_id_txn(
        &self,
        txn: &WriteTransaction,
        email: &str,
    ) -> StorageResult<Option<u64>> {
        let table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        Ok(table.get(email)?.map(|guard| guard.value()))
    }

    pub fn set_active(&self, txn: &WriteTransaction, email: &str, cart_id: u64) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        table.insert(email, cart_id)?;
        Ok(())
    }

    pub fn clear_active(&self, txn: &WriteTransaction, email: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        table.remove(email)?;
        Ok(())
    }
}
