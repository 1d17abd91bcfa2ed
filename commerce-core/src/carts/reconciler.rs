//! Abandoned cart reconciler
//!
//! The `active_carts` index maps a normalized email to the single cart of
//! that email with `recovered == false`. Upsert and recovery read and write
//! the index inside one write transaction, so two concurrent upserts for the
//! same email end up updating one row instead of creating two.

use super::storage::CartStorage;
use crate::db::{CommerceDb, StorageError};
use crate::money::{cart_subtotal, require_non_negative, validate_cart_line};
use crate::notify::NotificationService;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, normalize_email, validate_email, validate_optional_text,
    validate_required_text,
};
use crate::utils::{CommerceError, CommerceResult};
use rust_decimal::Decimal;
use shared::models::{AbandonedCart, CartLine, NotificationPayload, SCHEMA_VERSION};
use shared::util::now_millis;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone)]
pub struct CartReconciler {
    storage: CartStorage,
    notifier: NotificationService,
}

impl CartReconciler {
    pub fn new(db: CommerceDb, notifier: NotificationService) -> Self {
        Self {
            storage: CartStorage::new(db),
            notifier,
        }
    }

    /// Create the active cart of `email` or replace its contents
    pub fn upsert(
        &self,
        email: &str,
        items: Vec<CartLine>,
        total: Decimal,
        user_id: Option<String>,
    ) -> CommerceResult<AbandonedCart> {
        self.upsert_at(email, items, total, user_id, now_millis())
    }

    /// Upsert with an explicit clock
    pub fn upsert_at(
        &self,
        email: &str,
        items: Vec<CartLine>,
        total: Decimal,
        user_id: Option<String>,
        now: i64,
    ) -> CommerceResult<AbandonedCart> {
        validate_email(email, "user_email")?;
        validate_optional_text(&user_id, "user_id", MAX_SHORT_TEXT_LEN)?;
        if items.is_empty() {
            return Err(CommerceError::validation("cart has no items"));
        }
        for line in &items {
            validate_required_text(&line.product_name, "product_name", MAX_NAME_LEN)?;
            validate_cart_line(line)?;
        }
        let total = require_non_negative(total, "total_amount")?;
        let subtotal = cart_subtotal(&items);
        if total != subtotal {
            return Err(CommerceError::validation(format!(
                "total_amount {total} does not match cart lines ({subtotal})"
            )));
        }
        let email = normalize_email(email);

        let txn = self.storage.db().begin_write()?;

        let existing = match self.storage.active_cart_id_txn(&txn, &email)? {
            Some(cart_id) => match self.storage.get_cart_txn(&txn, cart_id)? {
                Some(cart) if !cart.recovered => Some(cart),
                Some(_) => {
                    tracing::warn!(cart_id, user_email = %email, "Index pointed at a recovered cart");
                    None
                }
                None => {
                    return Err(StorageError::DanglingIndex(format!(
                        "active cart {email} -> {cart_id}"
                    ))
                    .into());
                }
            },
            None => None,
        };

        let (cart, created) = match existing {
            Some(mut cart) => {
                cart.cart_items = items;
                cart.total_amount = total;
                if user_id.is_some() {
                    cart.user_id = user_id;
                }
                cart.updated_at = now;
                (cart, false)
            }
            None => {
                let cart = AbandonedCart {
                    schema_version: SCHEMA_VERSION,
                    id: self.storage.next_cart_id(&txn)?,
                    user_email: email.clone(),
                    user_id,
                    cart_items: items,
                    total_amount: total,
                    recovered: false,
                    recovered_at: None,
                    reminder_sent_count: 0,
                    last_reminder_sent_at: None,
                    created_at: now,
                    updated_at: now,
                };
                self.storage.set_active(&txn, &email, cart.id)?;
                (cart, true)
            }
        };

        self.storage.store_cart(&txn, &cart)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(
            cart_id = cart.id,
            user_email = %cart.user_email,
            items = cart.cart_items.len(),
            created,
            "Abandoned cart saved"
        );
        Ok(cart)
    }

    /// Flip the active cart of `email` to recovered; idempotent
    ///
    /// Returns the number of carts flipped (0 or 1).
    pub fn mark_recovered(&self, email: &str) -> CommerceResult<usize> {
        self.mark_recovered_at(email, now_millis())
    }

    pub fn mark_recovered_at(&self, email: &str, now: i64) -> CommerceResult<usize> {
        let email = normalize_email(email);
        let txn = self.storage.db().begin_write()?;

        let Some(cart_id) = self.storage.active_cart_id_txn(&txn, &email)? else {
            return Ok(0);
        };
        self.storage.clear_active(&txn, &email)?;

        let mut flipped = 0;
        if let Some(mut cart) = self.storage.get_cart_txn(&txn, cart_id)?
            && !cart.recovered
        {
            cart.recovered = true;
            cart.recovered_at = Some(now);
            cart.updated_at = now;
            self.storage.store_cart(&txn, &cart)?;
            flipped = 1;
        }
        txn.commit().map_err(StorageError::from)?;

        if flipped > 0 {
            tracing::info!(cart_id, user_email = %email, "Abandoned cart recovered");
        }
        Ok(flipped)
    }

    /// Send a reminder for an active cart
    ///
    /// The dispatch is awaited first and its outcome only logged; the reminder
    /// counter is advanced either way.
    pub async fn send_reminder(&self, cart_id: u64) -> CommerceResult<AbandonedCart> {
        let cart = self.get(cart_id)?;
        if cart.recovered {
            return Err(CommerceError::CartRecovered(cart_id));
        }

        let reminder_number = cart.reminder_sent_count + 1;
        let payload = NotificationPayload::CartReminder {
            cart_id,
            user_email: cart.user_email.clone(),
            items: cart.cart_items.clone(),
            total_amount: cart.total_amount,
            reminder_number,
        };
        match self.notifier.dispatch_now(&payload).await {
            Ok(()) => tracing::info!(cart_id, reminder_number, "Cart reminder sent"),
            Err(e) => tracing::warn!(
                cart_id,
                reminder_number,
                error = %e,
                "Cart reminder dispatch failed"
            ),
        }

        let now = now_millis();
        let txn = self.storage.db().begin_write()?;
        let mut cart = self
            .storage
            .get_cart_txn(&txn, cart_id)?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.to_string()))?;
        if cart.recovered {
            // recovered while the dispatch was in flight; history stays untouched
            tracing::info!(cart_id, "Cart recovered during reminder, count not updated");
            return Ok(cart);
        }
        cart.reminder_sent_count += 1;
        cart.last_reminder_sent_at = Some(now);
        cart.updated_at = now;
        self.storage.store_cart(&txn, &cart)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(cart)
    }

    // ========== Queries ==========

    pub fn get(&self, cart_id: u64) -> CommerceResult<AbandonedCart> {
        self.storage
            .get_cart(cart_id)?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// The active cart of `email`, if any
    pub fn active_for(&self, email: &str) -> CommerceResult<Option<AbandonedCart>> {
        let email = normalize_email(email);
        match self.storage.active_cart_id(&email)? {
            Some(cart_id) => Ok(self.storage.get_cart(cart_id)?.filter(|c| !c.recovered)),
            None => Ok(None),
        }
    }

    /// Active carts idle for at least `min_idle_minutes` with fewer than `max_reminders` sent
    ///
    /// Idle time counts from the later of the last update and the last reminder.
    pub fn due_for_reminder(
        &self,
        now: i64,
        min_idle_minutes: u32,
        max_reminders: u32,
    ) -> CommerceResult<Vec<AbandonedCart>> {
        let cutoff = now - i64::from(min_idle_minutes) * MILLIS_PER_MINUTE;
        let mut due: Vec<_> = self
            .storage
            .all_carts()?
            .into_iter()
            .filter(|cart| {
                let last_touch = cart
                    .last_reminder_sent_at
                    .map_or(cart.updated_at, |sent| sent.max(cart.updated_at));
                !cart.recovered && cart.reminder_sent_count < max_reminders && last_touch <= cutoff
            })
            .collect();
        due.sort_by_key(|cart| cart.updated_at);
        Ok(due)
    }
}
