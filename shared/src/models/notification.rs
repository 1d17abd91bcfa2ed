//! Notification payloads handed to the dispatcher

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartLine, OrderStatus};

/// Notification kind (枚举，非自由文本)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderStatusChanged,
    OrderCancelled,
    GiftCardDelivery,
    CartReminder,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Fully-formed notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    OrderStatusChanged {
        order_number: String,
        status: OrderStatus,
        customer_email: String,
        customer_name: Option<String>,
        customer_phone: Option<String>,
        tracking_number: Option<String>,
        carrier_name: Option<String>,
        est_delivery_date: Option<NaiveDate>,
    },
    OrderCancelled {
        order_number: String,
        customer_email: String,
        customer_name: Option<String>,
        cancellation_reason: Option<String>,
        refund_amount: Option<Decimal>,
        refund_method: Option<String>,
    },
    GiftCardDelivery {
        code: String,
        amount: Decimal,
        recipient_email: String,
        purchaser_email: String,
        message: Option<String>,
        expires_at: Option<i64>,
    },
    CartReminder {
        cart_id: u64,
        user_email: String,
        items: Vec<CartLine>,
        total_amount: Decimal,
        /// 1-based number of this reminder
        reminder_number: u32,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::OrderStatusChanged { .. } => NotificationKind::OrderStatusChanged,
            NotificationPayload::OrderCancelled { .. } => NotificationKind::OrderCancelled,
            NotificationPayload::GiftCardDelivery { .. } => NotificationKind::GiftCardDelivery,
            NotificationPayload::CartReminder { .. } => NotificationKind::CartReminder,
        }
    }

    /// Address the notification goes to
    pub fn recipient(&self) -> &str {
        match self {
            NotificationPayload::OrderStatusChanged { customer_email, .. }
            | NotificationPayload::OrderCancelled { customer_email, .. } => customer_email,
            NotificationPayload::GiftCardDelivery {
                recipient_email, ..
            } => recipient_email,
            NotificationPayload::CartReminder { user_email, .. } => user_email,
        }
    }
}
