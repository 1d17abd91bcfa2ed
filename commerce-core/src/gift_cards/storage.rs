//! Gift card tables: cards, code index, transaction log

use crate::db::{
    CommerceDb, GIFT_CARD_CODES_TABLE, GIFT_CARD_ID_KEY, GIFT_CARD_TXN_ID_KEY,
    GIFT_CARD_TXNS_TABLE, GIFT_CARDS_TABLE, StorageError, StorageResult, decode, encode,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::{GiftCard, GiftCardTransaction};

#[derive(Debug, Clone)]
pub struct GiftCardStorage {
    db: CommerceDb,
}

impl GiftCardStorage {
    pub fn new(db: CommerceDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CommerceDb {
        &self.db
    }

    pub fn next_card_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.db.next_value(txn, GIFT_CARD_ID_KEY)
    }

    pub fn next_transaction_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.db.next_value(txn, GIFT_CARD_TXN_ID_KEY)
    }

    // ========== Cards ==========

    /// Get a card by normalized code
    pub fn find_by_code(&self, code: &str) -> StorageResult<Option<GiftCard>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(GIFT_CARD_CODES_TABLE)?;
        let Some(id) = codes.get(code)?.map(|guard| guard.value()) else {
            return Ok(None);
        };

        let cards = read_txn.open_table(GIFT_CARDS_TABLE)?;
        match cards.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Err(StorageError::DanglingIndex(format!(
                "gift card code {code} -> {id}"
            ))),
        }
    }

    /// Get a card by id (within transaction)
    pub fn get_card_txn(&self, txn: &WriteTransaction, id: u64) -> StorageResult<Option<GiftCard>> {
        let table = txn.open_table(GIFT_CARDS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Whether a code is already taken (within transaction)
    pub fn code_exists_txn(&self, txn: &WriteTransaction, code: &str) -> StorageResult<bool> {
        let table = txn.open_table(GIFT_CARD_CODES_TABLE)?;
        Ok(table.get(code)?.is_some())
    }

    /// Insert a new card and its code index entry (within transaction)
    pub fn insert_card(&self, txn: &WriteTransaction, card: &GiftCard) -> StorageResult<()> {
        let mut codes = txn.open_table(GIFT_CARD_CODES_TABLE)?;
        codes.insert(card.code.as_str(), card.id)?;
        self.store_card(txn, card)
    }

    /// Overwrite the card row (within transaction)
    pub fn store_card(&self, txn: &WriteTransaction, card: &GiftCard) -> StorageResult<()> {
        let mut table = txn.open_table(GIFT_CARDS_TABLE)?;
        let value = encode(card)?;
        table.insert(card.id, value.as_slice())?;
        Ok(())
    }

    pub fn all_cards(&self) -> StorageResult<Vec<GiftCard>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GIFT_CARDS_TABLE)?;

        let mut cards = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            cards.push(decode(value.value())?);
        }
        Ok(cards)
    }

    // ========== Transactions (append-only) ==========

    pub fn append_transaction(
        &self,
        txn: &WriteTransaction,
        entry: &GiftCardTransaction,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(GIFT_CARD_TXNS_TABLE)?;
        let value = encode(entry)?;
        table.insert((entry.gift_card_id, entry.id), value.as_slice())?;
        Ok(())
    }

    /// All transactions of one card, oldest first
    pub fn transactions_for(&self, card_id: u64) -> StorageResult<Vec<GiftCardTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GIFT_CARD_TXNS_TABLE)?;
        collect_transactions(&table, card_id)
    }

    /// All transactions of one card (within transaction)
    pub fn transactions_for_txn(
        &self,
        txn: &WriteTransaction,
        card_id: u64,
    ) -> StorageResult<Vec<GiftCardTransaction>> {
        let table = txn.open_table(GIFT_CARD_TXNS_TABLE)?;
        collect_transactions(&table, card_id)
    }
}

fn collect_transactions(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
    card_id: u64,
) -> StorageResult<Vec<GiftCardTransaction>> {
    let mut entries = Vec::new();
    for result in table.range((card_id, 0u64)..=(card_id, u64::MAX))? {
        let (_key, value) = result?;
        let entry: GiftCardTransaction = decode(value.value())?;
        entries.push(entry);
    }
    entries.sort_by_key(|e| e.id);
    Ok(entries)
}
