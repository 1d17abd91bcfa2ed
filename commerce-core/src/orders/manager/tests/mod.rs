use super::*;
use crate::notify::RecordingDispatcher;
use chrono::TimeZone;
use shared::models::{CancellationDetails, NotificationKind};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

/// Milliseconds of a wall-clock time in the business timezone
fn ist_millis(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    ist()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .timestamp_millis()
}

/// Monday 2026-10-19 10:00 IST
fn monday_morning() -> i64 {
    ist_millis(2026, 10, 19, 10, 0)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create_test_manager() -> (FulfillmentManager, Receiver<NotificationPayload>) {
    let db = CommerceDb::open_in_memory().unwrap();
    let (notifier, rx) = NotificationService::new(Arc::new(RecordingDispatcher::new()), 32);
    (FulfillmentManager::new(db, notifier, ist()), rx)
}

fn mumbai() -> ShippingAddress {
    ShippingAddress {
        line1: "14 Marine Drive".to_string(),
        line2: None,
        city: "Mumbai".to_string(),
        state: "Maharashtra".to_string(),
        postal_code: "400020".to_string(),
        country: "India".to_string(),
    }
}

fn ready_item(price: i64, quantity: u32) -> OrderItem {
    OrderItem {
        product_id: 11,
        product_name: "Block Print Cushion".to_string(),
        quantity,
        unit_price: Decimal::new(price, 0),
        is_made_to_order: false,
        prep_time_days: None,
    }
}

fn made_to_order_item(price: i64, prep_days: u32) -> OrderItem {
    OrderItem {
        product_id: 42,
        product_name: "Hand-woven Rug".to_string(),
        quantity: 1,
        unit_price: Decimal::new(price, 0),
        is_made_to_order: true,
        prep_time_days: Some(prep_days),
    }
}

fn new_order(items: Vec<OrderItem>) -> NewOrder {
    NewOrder {
        customer_email: "Asha@Example.in".to_string(),
        customer_name: Some("Asha Rao".to_string()),
        customer_phone: Some("+91 98200 00000".to_string()),
        shipping_address: mumbai(),
        items,
        tax: Decimal::new(90, 0),
        shipping_cost: Decimal::new(60, 0),
        gift_card_code: None,
        gift_card_discount: Decimal::ZERO,
    }
}

fn place_simple(manager: &FulfillmentManager) -> Order {
    manager
        .place_order_at(new_order(vec![ready_item(500, 2)]), monday_morning())
        .unwrap()
}

/// Drive an order through the given statuses
fn advance(manager: &FulfillmentManager, order_id: u64, path: &[OrderStatus]) -> Order {
    let mut order = manager.get_order(order_id).unwrap();
    for status in path {
        order = manager
            .transition(order_id, StatusChange::to(*status).by("staff:priya"))
            .unwrap();
    }
    order
}

fn drain(rx: &mut Receiver<NotificationPayload>) -> Vec<NotificationPayload> {
    let mut out = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        out.push(payload);
    }
    out
}

mod test_notifications;
