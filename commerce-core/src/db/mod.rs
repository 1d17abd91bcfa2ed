//! redb-based storage shared by every component
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `gift_cards` | `card_id` | `GiftCard` | Gift card rows (cached balance) |
//! | `gift_card_codes` | `code` | `card_id` | Unique code index |
//! | `gift_card_transactions` | `(card_id, txn_id)` | `GiftCardTransaction` | Ledger (append-only) |
//! | `orders` | `order_id` | `Order` | Order rows |
//! | `order_numbers` | `order_number` | `order_id` | Unique order number index |
//! | `order_status_history` | `(order_id, history_id)` | `OrderStatusHistory` | Status audit trail (append-only) |
//! | `abandoned_carts` | `cart_id` | `AbandonedCart` | Cart rows (active + recovered) |
//! | `active_carts` | `user_email` | `cart_id` | One active cart per email |
//! | `counters` | name | `u64` | Id and order-number sequences |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time; `begin_write` blocks
//! until the previous writer commits or aborts. Every mutation is one write
//! transaction, so a failed operation leaves nothing behind (dropping an
//! uncommitted `WriteTransaction` aborts it).
//!
//! # Durability
//!
//! redb uses `Durability::Immediate` by default: commits are persistent as
//! soon as `commit()` returns and the file is always in a consistent state.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Gift cards: key = card_id, value = JSON-serialized GiftCard
pub const GIFT_CARDS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("gift_cards");

/// Unique code index: key = code, value = card_id
pub const GIFT_CARD_CODES_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("gift_card_codes");

/// Ledger: key = (card_id, txn_id), value = JSON-serialized GiftCardTransaction
pub const GIFT_CARD_TXNS_TABLE: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("gift_card_transactions");

/// Orders: key = order_id, value = JSON-serialized Order
pub const ORDERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

/// Unique order number index: key = order_number, value = order_id
pub const ORDER_NUMBERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("order_numbers");

/// Status history: key = (order_id, history_id), value = JSON-serialized OrderStatusHistory
pub const ORDER_HISTORY_TABLE: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("order_status_history");

/// Abandoned carts: key = cart_id, value = JSON-serialized AbandonedCart
pub const CARTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("abandoned_carts");

/// Active cart index: key = normalized email, value = cart_id
pub const ACTIVE_CARTS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("active_carts");

/// Counters: key = counter name, value = last issued value
pub const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

pub const GIFT_CARD_ID_KEY: &str = "gift_card_id";
pub const GIFT_CARD_TXN_ID_KEY: &str = "gift_card_txn_id";
pub const ORDER_ID_KEY: &str = "order_id";
pub const ORDER_HISTORY_ID_KEY: &str = "order_history_id";
pub const CART_ID_KEY: &str = "cart_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An index points at a row that does not exist
    #[error("Dangling index: {0}")]
    DanglingIndex(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Handle to the single shared store
#[derive(Clone)]
pub struct CommerceDb {
    db: Arc<Database>,
}

impl std::fmt::Debug for CommerceDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceDb").finish_non_exhaustive()
    }
}

impl CommerceDb {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, dry runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(GIFT_CARDS_TABLE)?;
            let _ = write_txn.open_table(GIFT_CARD_CODES_TABLE)?;
            let _ = write_txn.open_table(GIFT_CARD_TXNS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_HISTORY_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_CARTS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (snapshot isolation)
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Counters ==========

    /// Increment a named counter and return the new value (within transaction)
    pub fn next_value(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    /// Allocate a value from a named counter in its own transaction
    pub fn allocate(&self, key: &str) -> StorageResult<u64> {
        let txn = self.begin_write()?;
        let value = self.next_value(&txn, key)?;
        txn.commit()?;
        Ok(value)
    }

    /// Current counter value (read-only)
    pub fn current_value(&self, key: &str) -> StorageResult<u64> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table.get(key)?.map(|guard| guard.value()).unwrap_or(0))
    }
}

/// Serialize a record for storage
pub fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a stored record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
