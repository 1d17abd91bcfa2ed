//! Gift Card Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::default_schema_version;

/// Gift card entity
///
/// `current_balance` is a cached projection of the transaction log:
/// `initial_balance - Σ redemption + Σ refund`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftCard {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: u64,
    /// `WZ-XXXX-XXXX`, unique
    pub code: String,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub is_active: bool,
    pub expires_at: Option<i64>,
    /// Set when the balance reaches zero through redemption
    pub used_at: Option<i64>,
    pub purchaser_email: String,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GiftCard {
    /// Whether `expires_at` lies strictly before `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }
}

/// Ledger transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Redemption,
    Refund,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Redemption => write!(f, "redemption"),
            TransactionType::Refund => write!(f, "refund"),
        }
    }
}

/// Append-only ledger row (never updated or deleted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftCardTransaction {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: u64,
    pub gift_card_id: u64,
    /// Always positive; the direction comes from `transaction_type`
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub order_id: Option<u64>,
    pub created_at: i64,
}

/// Issue payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardIssue {
    pub amount: Decimal,
    pub purchaser_email: String,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
}

/// Cached balance vs. balance recomputed from the transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub gift_card_id: u64,
    pub code: String,
    pub cached: Decimal,
    pub computed: Decimal,
    pub consistent: bool,
}
