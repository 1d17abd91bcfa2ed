//! Gift card ledger
//!
//! The transaction log is the ground truth; `GiftCard::current_balance` is a
//! cached projection kept equal to
//! `initial_balance - Σ redemption + Σ refund` by writing the card row and
//! its transaction row in the same write transaction.
//!
//! # Redemption (optimistic compare-and-swap)
//!
//! ```text
//! loop (1 + max_retries attempts):
//!   observed = snapshot read of the card
//!   validate (active, not expired, amount <= observed balance)
//!   begin_write
//!     current = re-read card
//!     current != observed  → abort, retry
//!     write card + append redemption, commit
//! exhausted → ConcurrencyConflict
//! ```
//!
//! Writers are serialized by redb, so a commit only happens against the
//! exact balance that was validated.

use super::storage::GiftCardStorage;
use crate::db::{CommerceDb, StorageError};
use crate::money::require_positive;
use crate::notify::NotificationService;
use crate::utils::validation::{
    MAX_NOTE_LEN, normalize_email, validate_email, validate_optional_email, validate_optional_text,
};
use crate::utils::{CommerceError, CommerceResult};
use rust_decimal::Decimal;
use shared::models::{
    BalanceCheck, GiftCard, GiftCardIssue, GiftCardTransaction, NotificationPayload,
    SCHEMA_VERSION, TransactionType,
};
use shared::util::{generate_gift_card_code, normalize_gift_card_code, now_millis};

/// Attempts at finding an unused code before giving up
const MAX_CODE_ATTEMPTS: usize = 8;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Ledger settings (from [`crate::Config`])
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// `None` issues cards that never expire
    pub validity_days: Option<u32>,
    /// CAS retries after the first attempt
    pub max_retries: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            validity_days: Some(365),
            max_retries: 3,
        }
    }
}

/// Balance change computed from an observed card
struct Mutation {
    card: GiftCard,
    entry_type: TransactionType,
    amount: Decimal,
    order_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GiftCardLedger {
    storage: GiftCardStorage,
    notifier: NotificationService,
    settings: LedgerSettings,
    generate_code: fn() -> String,
}

impl GiftCardLedger {
    pub fn new(db: CommerceDb, notifier: NotificationService, settings: LedgerSettings) -> Self {
        Self {
            storage: GiftCardStorage::new(db),
            notifier,
            settings,
            generate_code: generate_gift_card_code,
        }
    }

    /// Replace the code generator (collision tests)
    pub fn with_code_generator(mut self, generate_code: fn() -> String) -> Self {
        self.generate_code = generate_code;
        self
    }

    // ========== Issue ==========

    pub fn issue(&self, request: GiftCardIssue) -> CommerceResult<GiftCard> {
        self.issue_at(request, now_millis())
    }

    /// Issue with an explicit clock
    pub fn issue_at(&self, request: GiftCardIssue, now: i64) -> CommerceResult<GiftCard> {
        let amount = require_positive(request.amount, "amount")?;
        validate_email(&request.purchaser_email, "purchaser_email")?;
        validate_optional_email(&request.recipient_email, "recipient_email")?;
        validate_optional_text(&request.message, "message", MAX_NOTE_LEN)?;

        let txn = self.storage.db().begin_write()?;

        let mut code = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = (self.generate_code)();
            if !self.storage.code_exists_txn(&txn, &candidate)? {
                code = Some(candidate);
                break;
            }
            tracing::debug!(code = %candidate, "Gift card code collision, regenerating");
        }
        let Some(code) = code else {
            return Err(CommerceError::Internal(format!(
                "no unused gift card code after {MAX_CODE_ATTEMPTS} attempts"
            )));
        };

        let card = GiftCard {
            schema_version: SCHEMA_VERSION,
            id: self.storage.next_card_id(&txn)?,
            code,
            initial_balance: amount,
            current_balance: amount,
            is_active: true,
            expires_at: self
                .settings
                .validity_days
                .map(|days| now + i64::from(days) * MILLIS_PER_DAY),
            used_at: None,
            purchaser_email: normalize_email(&request.purchaser_email),
            recipient_email: request.recipient_email.as_deref().map(normalize_email),
            message: request.message,
            created_at: now,
            updated_at: now,
        };
        let entry = GiftCardTransaction {
            schema_version: SCHEMA_VERSION,
            id: self.storage.next_transaction_id(&txn)?,
            gift_card_id: card.id,
            amount,
            transaction_type: TransactionType::Purchase,
            order_id: None,
            created_at: now,
        };

        self.storage.insert_card(&txn, &card)?;
        self.storage.append_transaction(&txn, &entry)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            gift_card_id = card.id,
            code = %card.code,
            amount = %amount,
            "Gift card issued"
        );

        self.notifier.enqueue(NotificationPayload::GiftCardDelivery {
            code: card.code.clone(),
            amount,
            recipient_email: card
                .recipient_email
                .clone()
                .unwrap_or_else(|| card.purchaser_email.clone()),
            purchaser_email: card.purchaser_email.clone(),
            message: card.message.clone(),
            expires_at: card.expires_at,
        });

        Ok(card)
    }

    // ========== Redeem / Refund ==========

    pub fn redeem(
        &self,
        code: &str,
        amount: Decimal,
        order_id: Option<u64>,
    ) -> CommerceResult<GiftCard> {
        self.redeem_at(code, amount, order_id, now_millis())
    }

    /// Redeem with an explicit clock
    pub fn redeem_at(
        &self,
        code: &str,
        amount: Decimal,
        order_id: Option<u64>,
        now: i64,
    ) -> CommerceResult<GiftCard> {
        let amount = require_positive(amount, "amount")?;
        let code = normalize_gift_card_code(code);

        let card = self.compare_and_swap(&code, |observed| {
            if !observed.is_active {
                return Err(CommerceError::GiftCardNotFound(code.clone()));
            }
            if observed.is_expired_at(now) {
                return Err(CommerceError::Expired(code.clone()));
            }
            if amount > observed.current_balance {
                return Err(CommerceError::InsufficientBalance {
                    requested: amount,
                    available: observed.current_balance,
                });
            }

            let mut card = observed.clone();
            card.current_balance = observed.current_balance - amount;
            card.is_active = card.current_balance > Decimal::ZERO;
            if card.current_balance.is_zero() {
                card.used_at = Some(now);
            }
            card.updated_at = now;
            Ok(Mutation {
                card,
                entry_type: TransactionType::Redemption,
                amount,
                order_id,
            })
        })?;

        tracing::info!(
            gift_card_id = card.id,
            code = %card.code,
            amount = %amount,
            order_id = ?order_id,
            balance = %card.current_balance,
            "Gift card redeemed"
        );
        Ok(card)
    }

    pub fn refund(
        &self,
        code: &str,
        amount: Decimal,
        order_id: Option<u64>,
    ) -> CommerceResult<GiftCard> {
        self.refund_at(code, amount, order_id, now_millis())
    }

    /// Refund with an explicit clock
    ///
    /// A card exhausted by redemption becomes active again; a card
    /// deactivated by staff stays inactive.
    pub fn refund_at(
        &self,
        code: &str,
        amount: Decimal,
        order_id: Option<u64>,
        now: i64,
    ) -> CommerceResult<GiftCard> {
        let amount = require_positive(amount, "amount")?;
        let code = normalize_gift_card_code(code);

        let card = self.compare_and_swap(&code, |observed| {
            let balance = observed.current_balance + amount;
            if balance > observed.initial_balance {
                return Err(CommerceError::RefundExceedsInitial {
                    amount,
                    initial: observed.initial_balance,
                });
            }

            let mut card = observed.clone();
            card.current_balance = balance;
            if observed.used_at.is_some() {
                card.used_at = None;
                card.is_active = true;
            }
            card.updated_at = now;
            Ok(Mutation {
                card,
                entry_type: TransactionType::Refund,
                amount,
                order_id,
            })
        })?;

        tracing::info!(
            gift_card_id = card.id,
            code = %card.code,
            amount = %amount,
            order_id = ?order_id,
            balance = %card.current_balance,
            "Gift card refunded"
        );
        Ok(card)
    }

    /// Optimistic retry loop around [`Self::try_commit`]
    fn compare_and_swap<F>(&self, code: &str, plan: F) -> CommerceResult<GiftCard>
    where
        F: Fn(&GiftCard) -> CommerceResult<Mutation>,
    {
        let attempts = self.settings.max_retries + 1;
        for attempt in 1..=attempts {
            let observed = self
                .storage
                .find_by_code(code)?
                .ok_or_else(|| CommerceError::GiftCardNotFound(code.to_string()))?;
            let mutation = plan(&observed)?;

            if let Some(card) = self.try_commit(&observed, mutation)? {
                return Ok(card);
            }
            tracing::debug!(code = %code, attempt, "Gift card balance changed concurrently, retrying");
        }

        tracing::warn!(code = %code, attempts, "Gift card update lost every race");
        Err(CommerceError::ConcurrencyConflict(format!(
            "gift card {code} changed concurrently"
        )))
    }

    /// Commit `mutation` only if the stored card still equals `observed`
    ///
    /// Returns `None` (nothing written) when the card changed in between.
    fn try_commit(
        &self,
        observed: &GiftCard,
        mutation: Mutation,
    ) -> CommerceResult<Option<GiftCard>> {
        let txn = self.storage.db().begin_write()?;

        let current = self
            .storage
            .get_card_txn(&txn, observed.id)?
            .ok_or_else(|| CommerceError::GiftCardNotFound(observed.code.clone()))?;
        if current.current_balance != observed.current_balance
            || current.is_active != observed.is_active
            || current.updated_at != observed.updated_at
        {
            // dropping the transaction aborts it
            return Ok(None);
        }

        let entry = GiftCardTransaction {
            schema_version: SCHEMA_VERSION,
            id: self.storage.next_transaction_id(&txn)?,
            gift_card_id: mutation.card.id,
            amount: mutation.amount,
            transaction_type: mutation.entry_type,
            order_id: mutation.order_id,
            created_at: mutation.card.updated_at,
        };
        self.storage.store_card(&txn, &mutation.card)?;
        self.storage.append_transaction(&txn, &entry)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(Some(mutation.card))
    }

    // ========== Queries ==========

    /// Read-only lookup; inactive cards are returned as-is
    pub fn lookup(&self, code: &str) -> CommerceResult<GiftCard> {
        let code = normalize_gift_card_code(code);
        self.storage
            .find_by_code(&code)?
            .ok_or(CommerceError::GiftCardNotFound(code))
    }

    /// Full transaction history, oldest first
    pub fn transactions(&self, code: &str) -> CommerceResult<Vec<GiftCardTransaction>> {
        let card = self.lookup(code)?;
        Ok(self.storage.transactions_for(card.id)?)
    }

    /// Compare the cached balance with the balance derived from the log
    pub fn verify_balance(&self, code: &str) -> CommerceResult<BalanceCheck> {
        let card = self.lookup(code)?;
        let entries = self.storage.transactions_for(card.id)?;
        Ok(balance_check(&card, &entries))
    }

    // ========== Staff / maintenance ==========

    /// Staff deactivation; idempotent
    pub fn deactivate(&self, code: &str) -> CommerceResult<GiftCard> {
        let found = self.lookup(code)?;
        let txn = self.storage.db().begin_write()?;
        let mut card = self
            .storage
            .get_card_txn(&txn, found.id)?
            .ok_or(CommerceError::GiftCardNotFound(found.code))?;

        if !card.is_active {
            return Ok(card);
        }
        card.is_active = false;
        card.updated_at = now_millis();
        self.storage.store_card(&txn, &card)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(gift_card_id = card.id, code = %card.code, "Gift card deactivated");
        Ok(card)
    }

    /// Recompute every cached balance from the transaction log and rewrite drifted ones
    ///
    /// Returns the checks of the repaired cards (as found before the repair).
    pub fn repair_balances(&self) -> CommerceResult<Vec<BalanceCheck>> {
        let txn = self.storage.db().begin_write()?;
        let now = now_millis();

        let mut repaired = Vec::new();
        for card in self.storage.all_cards()? {
            let Some(mut card) = self.storage.get_card_txn(&txn, card.id)? else {
                continue;
            };
            let entries = self.storage.transactions_for_txn(&txn, card.id)?;
            let check = balance_check(&card, &entries);
            if check.consistent {
                continue;
            }

            tracing::warn!(
                gift_card_id = card.id,
                code = %card.code,
                cached = %check.cached,
                computed = %check.computed,
                "Gift card balance drift, rewriting cache"
            );
            card.current_balance = check.computed;
            card.updated_at = now;
            self.storage.store_card(&txn, &card)?;
            repaired.push(check);
        }

        txn.commit().map_err(StorageError::from)?;
        if !repaired.is_empty() {
            tracing::warn!(count = repaired.len(), "Gift card balances repaired");
        }
        Ok(repaired)
    }
}

/// `Σ purchase - Σ redemption + Σ refund` vs. the cached balance
fn balance_check(card: &GiftCard, entries: &[GiftCardTransaction]) -> BalanceCheck {
    let computed = entries
        .iter()
        .fold(Decimal::ZERO, |acc, entry| match entry.transaction_type {
            TransactionType::Purchase | TransactionType::Refund => acc + entry.amount,
            TransactionType::Redemption => acc - entry.amount,
        });
    BalanceCheck {
        gift_card_id: card.id,
        code: card.code.clone(),
        cached: card.current_balance,
        computed,
        consistent: computed == card.current_balance,
    }
}
