use super::*;

#[test]
fn test_placement_and_preparing_are_silent() {
    let (manager, mut rx) = create_test_manager();
    let order = place_simple(&manager);
    advance(&manager, order.id, &[OrderStatus::Preparing]);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_shipped_carries_tracking() {
    let (manager, mut rx) = create_test_manager();
    let order = place_simple(&manager);
    advance(&manager, order.id, &[OrderStatus::Preparing]);
    manager
        .attach_tracking(
            order.id,
            TrackingUpdate {
                tracking_number: Some("DL55501".to_string()),
                carrier_name: Some("Delhivery".to_string()),
                recompute_estimate: true,
            },
        )
        .unwrap();
    advance(&manager, order.id, &[OrderStatus::Shipped]);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        NotificationPayload::OrderStatusChanged {
            order_number,
            status,
            customer_email,
            tracking_number,
            carrier_name,
            est_delivery_date,
            ..
        } => {
            assert_eq!(order_number, &order.order_number);
            assert_eq!(*status, OrderStatus::Shipped);
            assert_eq!(customer_email, "asha@example.in");
            assert_eq!(tracking_number.as_deref(), Some("DL55501"));
            assert_eq!(carrier_name.as_deref(), Some("Delhivery"));
            assert!(est_delivery_date.is_some());
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn test_delivered_notifies() {
    let (manager, mut rx) = create_test_manager();
    let order = place_simple(&manager);
    advance(
        &manager,
        order.id,
        &[
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
    );

    let kinds: Vec<_> = drain(&mut rx).iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::OrderStatusChanged,
            NotificationKind::OrderStatusChanged
        ]
    );
}

#[test]
fn test_cancellation_payload() {
    let (manager, mut rx) = create_test_manager();
    let order = place_simple(&manager);
    manager
        .transition(
            order.id,
            StatusChange::to(OrderStatus::Cancelled)
                .by("staff:priya")
                .with_cancellation(CancellationDetails {
                    reason: "Fabric out of stock".to_string(),
                    refund_amount: Some(Decimal::new(1150, 0)),
                    refund_method: Some("original payment".to_string()),
                }),
        )
        .unwrap();

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        NotificationPayload::OrderCancelled {
            order_number: order.order_number.clone(),
            customer_email: "asha@example.in".to_string(),
            customer_name: Some("Asha Rao".to_string()),
            cancellation_reason: Some("Fabric out of stock".to_string()),
            refund_amount: Some(Decimal::new(1150, 0)),
            refund_method: Some("original payment".to_string()),
        }
    );

    // the reason is also kept in the history notes
    let history = manager.history(order.id).unwrap();
    assert_eq!(
        history.last().unwrap().notes.as_deref(),
        Some("Fabric out of stock")
    );
}

#[test]
fn test_rejected_transition_sends_nothing() {
    let (manager, mut rx) = create_test_manager();
    let order = place_simple(&manager);
    assert!(manager
        .transition(order.id, StatusChange::to(OrderStatus::Delivered))
        .is_err());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_full_queue_does_not_fail_transition() {
    let db = CommerceDb::open_in_memory().unwrap();
    let (notifier, rx) = NotificationService::new(Arc::new(RecordingDispatcher::new()), 1);
    drop(rx);
    let manager = FulfillmentManager::new(db, notifier, ist());

    let order = place_simple(&manager);
    let order = advance(
        &manager,
        order.id,
        &[OrderStatus::Preparing, OrderStatus::Shipped],
    );
    assert_eq!(order.status, OrderStatus::Shipped);
}
