//! Abandoned Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::default_schema_version;

/// Cart line snapshot (closed record, replaces free-form JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Abandoned cart
///
/// At most one row with `recovered == false` exists per `user_email`.
/// Once recovered the row is immutable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonedCart {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: u64,
    /// Normalized (trimmed, lowercase)
    pub user_email: String,
    pub user_id: Option<String>,
    pub cart_items: Vec<CartLine>,
    pub total_amount: Decimal,
    pub recovered: bool,
    pub recovered_at: Option<i64>,
    pub reminder_sent_count: u32,
    pub last_reminder_sent_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}
