//! Order tables: orders, order number index, status history

use crate::db::{
    CommerceDb, ORDER_HISTORY_ID_KEY, ORDER_HISTORY_TABLE, ORDER_ID_KEY, ORDER_NUMBERS_TABLE,
    ORDERS_TABLE, StorageError, StorageResult, decode, encode,
};
use chrono::NaiveDate;
use redb::{ReadableTable, WriteTransaction};
use shared::models::{Order, OrderStatusHistory};

#[derive(Debug, Clone)]
pub struct OrderStorage {
    db: CommerceDb,
}

impl OrderStorage {
    pub fn new(db: CommerceDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CommerceDb {
        &self.db
    }

    // ========== Sequences ==========

    pub fn next_order_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.db.next_value(txn, ORDER_ID_KEY)
    }

    /// Reserve an order id in its own transaction
    pub fn reserve_order_id(&self) -> StorageResult<u64> {
        self.db.allocate(ORDER_ID_KEY)
    }

    pub fn next_history_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.db.next_value(txn, ORDER_HISTORY_ID_KEY)
    }

    /// Per-business-day order number sequence (starts at 1 every day)
    pub fn next_daily_sequence(
        &self,
        txn: &WriteTransaction,
        date: NaiveDate,
    ) -> StorageResult<u64> {
        let key = format!("order_seq:{}", date.format("%Y%m%d"));
        self.db.next_value(txn, &key)
    }

    // ========== Orders ==========

    pub fn get_order(&self, order_id: u64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_by_number(&self, order_number: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let numbers = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let Some(order_id) = numbers.get(order_number)?.map(|guard| guard.value()) else {
            return Ok(None);
        };

        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Err(StorageError::DanglingIndex(format!(
                "order number {order_number} -> {order_id}"
            ))),
        }
    }

    pub fn order_exists_txn(&self, txn: &WriteTransaction, order_id: u64) -> StorageResult<bool> {
        let table = txn.open_table(ORDERS_TABLE)?;
        Ok(table.get(order_id)?.is_some())
    }

    /// Insert a new order and its number index entry (within transaction)
    pub fn insert_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
        numbers.insert(order.order_number.as_str(), order.id)?;
        self.store_order(txn, order)
    }

    /// Overwrite the order row (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = encode(order)?;
        table.insert(order.id, value.as_slice())?;
        Ok(())
    }

    pub fn all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(decode(value.value())?);
        }
        Ok(orders)
    }

    // ========== Status history (append-only) ==========

    pub fn append_history(
        &self,
        txn: &WriteTransaction,
        entry: &OrderStatusHistory,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_HISTORY_TABLE)?;
        let value = encode(entry)?;
        table.insert((entry.order_id, entry.id), value.as_slice())?;
        Ok(())
    }

    /// Status history of one order, oldest first
    pub fn history_for(&self, order_id: u64) -> StorageResult<Vec<OrderStatusHistory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_HISTORY_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            let entry: OrderStatusHistory = decode(value.value())?;
            entries.push(entry);
        }

        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    /// Most recent history row of one order
    pub fn latest_history(&self, order_id: u64) -> StorageResult<Option<OrderStatusHistory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_HISTORY_TABLE)?;

        let last = table
            .range((order_id, 0u64)..=(order_id, u64::MAX))?
            .next_back()
            .transpose()?;
        match last {
            Some((_key, value)) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }
}
