//! Order Model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::default_schema_version;

/// Fulfillment status
///
/// `pending → preparing → shipped → delivered`, with `cancelled`
/// reachable from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping address (closed record, replaces free-form JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Point-in-time item snapshot, immutable once the order is placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub is_made_to_order: bool,
    /// Preparation days for made-to-order products
    pub prep_time_days: Option<u32>,
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: u64,
    /// `WZ-YYYYMMDD-NNNN`, unique and immutable
    pub order_number: String,
    /// Only the state machine writes this field
    pub status: OrderStatus,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub gift_card_code: Option<String>,
    pub gift_card_discount: Decimal,
    /// `subtotal + tax + shipping_cost - gift_card_discount`, never negative
    pub total: Decimal,
    pub tracking_number: Option<String>,
    pub carrier_name: Option<String>,
    pub est_delivery_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Append-only status audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub id: u64,
    pub order_id: u64,
    pub status: OrderStatus,
    pub changed_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
}

/// Place-order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub gift_card_code: Option<String>,
    #[serde(default)]
    pub gift_card_discount: Decimal,
}

/// Refund requested alongside a cancellation (advisory only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationDetails {
    pub reason: String,
    pub refund_amount: Option<Decimal>,
    pub refund_method: Option<String>,
}

/// Status change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub to: OrderStatus,
    pub changed_by: Option<String>,
    pub notes: Option<String>,
    pub cancellation: Option<CancellationDetails>,
}

impl StatusChange {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            to: status,
            changed_by: None,
            notes: None,
            cancellation: None,
        }
    }

    pub fn by(mut self, staff: impl Into<String>) -> Self {
        self.changed_by = Some(staff.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationDetails) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Carrier / tracking attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub tracking_number: Option<String>,
    pub carrier_name: Option<String>,
    /// Re-run the delivery estimator with the new carrier
    #[serde(default)]
    pub recompute_estimate: bool,
}

/// Order status vs. the latest history row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConsistency {
    pub order_id: u64,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub latest_history_status: Option<OrderStatus>,
    pub consistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        let status: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }
}
