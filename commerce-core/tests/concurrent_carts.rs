//! 并发弃购车写入测试
//!
//! Upserts for one email race on an on-disk store; the active-cart index
//! must leave exactly one active row.

use std::sync::{Arc, Barrier};
use std::thread;

use commerce_core::carts::{CartReconciler, CartStorage};
use commerce_core::notify::RecordingDispatcher;
use commerce_core::{CommerceDb, NotificationService};
use rust_decimal::Decimal;
use shared::models::CartLine;

const THREADS: u32 = 8;

fn line(quantity: u32) -> CartLine {
    CartLine {
        product_id: 7,
        product_name: "Ajrakh Dupatta".to_string(),
        quantity,
        unit_price: Decimal::new(1800, 0),
    }
}

#[test]
fn test_concurrent_upsert_keeps_one_active_cart() {
    let dir = tempfile::tempdir().unwrap();
    let db = CommerceDb::open(dir.path().join("commerce.redb")).unwrap();
    let (notifier, _rx) = NotificationService::new(Arc::new(RecordingDispatcher::new()), 16);
    let carts = CartReconciler::new(db.clone(), notifier);

    let barrier = Arc::new(Barrier::new(THREADS as usize));
    let handles: Vec<_> = (1..=THREADS)
        .map(|quantity| {
            let carts = carts.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                carts.upsert(
                    " Asha@Example.in ",
                    vec![line(quantity)],
                    Decimal::new(1800, 0) * Decimal::from(quantity),
                    None,
                )
            })
        })
        .collect();

    let ids: Vec<u64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().id)
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]), "ids diverged: {ids:?}");

    let active = carts.active_for("asha@example.in").unwrap().unwrap();
    assert_eq!(active.id, ids[0]);

    let stored = CartStorage::new(db).all_carts().unwrap();
    let active_rows = stored
        .iter()
        .filter(|c| c.user_email == "asha@example.in" && !c.recovered)
        .count();
    assert_eq!(active_rows, 1);
    assert_eq!(stored.len(), 1);

    // last writer wins, contents stay self-consistent
    let quantity = active.cart_items[0].quantity;
    assert_eq!(
        active.total_amount,
        Decimal::new(1800, 0) * Decimal::from(quantity)
    );
}
