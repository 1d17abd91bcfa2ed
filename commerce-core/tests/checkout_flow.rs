//! 结账流程集成测试
//!
//! redeem → place order → recover cart, wired through `CommerceCore`.

use std::sync::Arc;

use commerce_core::notify::RecordingDispatcher;
use commerce_core::{CheckoutRequest, CommerceCore, CommerceError, Config};
use rust_decimal::Decimal;
use shared::models::{
    CartLine, GiftCardIssue, NewOrder, NotificationPayload, OrderItem, OrderStatus,
    ShippingAddress, TransactionType,
};
use shared::util::now_millis;

const EMAIL: &str = "meera@example.in";

async fn setup() -> (CommerceCore, Arc<RecordingDispatcher>) {
    let mut config = Config::with_work_dir("unused");
    config.notify_retry_base_ms = 1;
    config.gift_card_validity_days = Some(365);
    config.cart_reminder_idle_minutes = 60;
    config.cart_max_reminders = 3;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let core = CommerceCore::in_memory(&config, dispatcher.clone())
        .await
        .unwrap();
    (core, dispatcher)
}

fn order_for(email: &str) -> NewOrder {
    NewOrder {
        customer_email: email.to_string(),
        customer_name: Some("Meera Iyer".to_string()),
        customer_phone: None,
        shipping_address: ShippingAddress {
            line1: "22 Residency Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560025".to_string(),
            country: "India".to_string(),
        },
        items: vec![OrderItem {
            product_id: 7,
            product_name: "Brass Diya".to_string(),
            quantity: 2,
            unit_price: Decimal::new(500, 0),
            is_made_to_order: false,
            prep_time_days: None,
        }],
        // payable: 1000 + 90 + 60 = 1150
        tax: Decimal::new(90, 0),
        shipping_cost: Decimal::new(60, 0),
        gift_card_code: None,
        gift_card_discount: Decimal::ZERO,
    }
}

fn issue(core: &CommerceCore, amount: i64) -> String {
    core.gift_cards
        .issue(GiftCardIssue {
            amount: Decimal::new(amount, 0),
            purchaser_email: "gifter@example.in".to_string(),
            recipient_email: Some(EMAIL.to_string()),
            message: Some("Happy Diwali".to_string()),
        })
        .unwrap()
        .code
}

fn abandon_cart(core: &CommerceCore, email: &str, at: i64) {
    let lines = vec![CartLine {
        product_id: 7,
        product_name: "Brass Diya".to_string(),
        quantity: 2,
        unit_price: Decimal::new(500, 0),
    }];
    core.carts
        .upsert_at(email, lines, Decimal::new(1000, 0), None, at)
        .unwrap();
}

#[tokio::test]
async fn test_checkout_partial_gift_card_recovers_cart() {
    let (core, _) = setup().await;
    let code = issue(&core, 500);
    abandon_cart(&core, EMAIL, now_millis());

    let receipt = core
        .checkout
        .checkout(CheckoutRequest {
            order: order_for(EMAIL),
            // lowercase input is normalized
            gift_card_code: Some(code.to_lowercase()),
        })
        .unwrap();

    let order = &receipt.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.gift_card_code.as_deref(), Some(code.as_str()));
    assert_eq!(order.gift_card_discount, Decimal::new(500, 0));
    assert_eq!(order.total, Decimal::new(650, 0));
    assert_eq!(receipt.carts_recovered, 1);

    let card = receipt.gift_card.unwrap();
    assert!(card.current_balance.is_zero());
    assert!(!card.is_active);
    assert!(card.used_at.is_some());

    let txns = core.gift_cards.transactions(&code).unwrap();
    let redemption = txns
        .iter()
        .find(|t| t.transaction_type == TransactionType::Redemption)
        .unwrap();
    assert_eq!(redemption.order_id, Some(order.id));
    assert_eq!(redemption.amount, Decimal::new(500, 0));

    assert!(core.carts.active_for(EMAIL).unwrap().is_none());
    assert_eq!(core.orders.history(order.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_discount_capped_at_payable() {
    let (core, _) = setup().await;
    let code = issue(&core, 2000);

    let receipt = core
        .checkout
        .checkout(CheckoutRequest {
            order: order_for(EMAIL),
            gift_card_code: Some(code.clone()),
        })
        .unwrap();

    assert_eq!(receipt.order.gift_card_discount, Decimal::new(1150, 0));
    assert!(receipt.order.total.is_zero());
    assert_eq!(receipt.carts_recovered, 0);

    let card = core.gift_cards.lookup(&code).unwrap();
    assert_eq!(card.current_balance, Decimal::new(850, 0));
    assert!(card.is_active);
}

#[tokio::test]
async fn test_checkout_failed_placement_refunds_card() {
    let (core, _) = setup().await;
    let code = issue(&core, 500);

    let err = core
        .checkout
        .checkout(CheckoutRequest {
            order: order_for("not-an-email"),
            gift_card_code: Some(code.clone()),
        })
        .unwrap_err();
    assert!(err.is_validation());

    let card = core.gift_cards.lookup(&code).unwrap();
    assert_eq!(card.current_balance, Decimal::new(500, 0));
    assert!(card.is_active);
    assert!(card.used_at.is_none());

    let kinds: Vec<_> = core
        .gift_cards
        .transactions(&code)
        .unwrap()
        .into_iter()
        .map(|t| t.transaction_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TransactionType::Purchase,
            TransactionType::Redemption,
            TransactionType::Refund
        ]
    );
    assert!(core.gift_cards.verify_balance(&code).unwrap().consistent);
}

#[tokio::test]
async fn test_checkout_unknown_gift_card() {
    let (core, _) = setup().await;
    abandon_cart(&core, EMAIL, now_millis());

    let err = core
        .checkout
        .checkout(CheckoutRequest {
            order: order_for(EMAIL),
            gift_card_code: Some("WZ-0000-0000".to_string()),
        })
        .unwrap_err();
    assert!(matches!(err, CommerceError::GiftCardNotFound(_)));

    // nothing placed, cart untouched
    assert!(core.carts.active_for(EMAIL).unwrap().is_some());
}

#[tokio::test]
async fn test_checkout_without_items() {
    let (core, _) = setup().await;
    let mut order = order_for(EMAIL);
    order.items.clear();

    let err = core
        .checkout
        .checkout(CheckoutRequest {
            order,
            gift_card_code: None,
        })
        .unwrap_err();
    assert!(matches!(err, CommerceError::EmptyOrder));
}

#[tokio::test]
async fn test_due_reminders_skip_fresh_carts() {
    let (core, dispatcher) = setup().await;
    let two_hours_ago = now_millis() - 2 * 60 * 60 * 1000;
    abandon_cart(&core, EMAIL, two_hours_ago);
    abandon_cart(&core, "ravi@example.in", now_millis());

    let sent = core.send_due_reminders().await.unwrap();
    assert_eq!(sent, 1);

    let reminders: Vec<_> = dispatcher
        .sent()
        .into_iter()
        .filter(|p| matches!(p, NotificationPayload::CartReminder { .. }))
        .collect();
    assert_eq!(reminders.len(), 1);

    let cart = core.carts.active_for(EMAIL).unwrap().unwrap();
    assert_eq!(cart.reminder_sent_count, 1);
    assert!(cart.last_reminder_sent_at.is_some());

    // idle clock restarted by the reminder
    assert_eq!(core.send_due_reminders().await.unwrap(), 0);
}

#[tokio::test]
async fn test_maintenance_on_consistent_store() {
    let (core, _) = setup().await;
    issue(&core, 300);
    core.checkout
        .checkout(CheckoutRequest {
            order: order_for(EMAIL),
            gift_card_code: None,
        })
        .unwrap();
    core.sessions.record_view("guest-1", 7);

    let report = core.run_maintenance().unwrap();
    assert_eq!(report.balances_repaired, 0);
    assert_eq!(report.status_mismatches, 0);
    assert_eq!(report.sessions_evicted, 0);
}

fn free_order(email: &str) -> NewOrder {
    let mut order = order_for(email);
    order.items[0].unit_price = Decimal::ZERO;
    order.tax = Decimal::ZERO;
    order.shipping_cost = Decimal::ZERO;
    order
}

#[tokio::test]
async fn test_free_order_rejects_expired_card() {
    let (core, _) = setup().await;
    let issued_long_ago = now_millis() - 400 * 24 * 60 * 60 * 1000;
    let code = core
        .gift_cards
        .issue_at(
            GiftCardIssue {
                amount: Decimal::new(500, 0),
                purchaser_email: "gifter@example.in".to_string(),
                recipient_email: None,
                message: None,
            },
            issued_long_ago,
        )
        .unwrap()
        .code;

    let err = core
        .checkout
        .checkout(CheckoutRequest {
            order: free_order(EMAIL),
            gift_card_code: Some(code.clone()),
        })
        .unwrap_err();
    assert!(matches!(err, CommerceError::Expired(_)));
    assert_eq!(core.gift_cards.transactions(&code).unwrap().len(), 1);
}

#[tokio::test]
async fn test_free_order_does_not_attach_unused_card() {
    let (core, _) = setup().await;
    let code = issue(&core, 500);

    let receipt = core
        .checkout
        .checkout(CheckoutRequest {
            order: free_order(EMAIL),
            gift_card_code: Some(code.clone()),
        })
        .unwrap();

    assert!(receipt.order.total.is_zero());
    assert!(receipt.order.gift_card_code.is_none());
    assert!(receipt.order.gift_card_discount.is_zero());
    assert!(receipt.gift_card.is_none());
    assert_eq!(
        core.gift_cards.lookup(&code).unwrap().current_balance,
        Decimal::new(500, 0)
    );
}
