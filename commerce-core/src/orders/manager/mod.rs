//! FulfillmentManager - order placement and status transitions
//!
//! # 流程
//!
//! ```text
//! transition(order_id, change)
//!     ├─ 1. validate notes / cancellation
//!     ├─ 2. begin_write
//!     ├─ 3. load order, check_transition(order.status, change.to)
//!     ├─ 4. append history row + update order.status
//!     ├─ 5. commit (both or neither)
//!     └─ 6. enqueue notification (shipped / delivered / cancelled)
//! ```
//!
//! `order.status` always equals the status of the latest history row: the
//! two are only ever written together.

use super::machine::check_transition;
use super::storage::OrderStorage;
use crate::db::{CommerceDb, StorageError};
use crate::delivery::{DeliveryQuery, estimate_from};
use crate::money::{order_subtotal, order_total, require_non_negative, validate_order_item};
use crate::notify::NotificationService;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, normalize_email,
    validate_email, validate_optional_text, validate_required_text,
};
use crate::utils::{CommerceError, CommerceResult};
use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use shared::models::{
    NewOrder, NotificationPayload, Order, OrderItem, OrderStatus, OrderStatusHistory,
    SCHEMA_VERSION, ShippingAddress, StatusChange, StatusConsistency, TrackingUpdate,
};
use shared::util::{business_date, format_order_number, normalize_gift_card_code, now_millis};

/// `changed_by` of rows written by the core itself
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone)]
pub struct FulfillmentManager {
    storage: OrderStorage,
    notifier: NotificationService,
    tz: FixedOffset,
}

impl FulfillmentManager {
    pub fn new(db: CommerceDb, notifier: NotificationService, tz: FixedOffset) -> Self {
        Self {
            storage: OrderStorage::new(db),
            notifier,
            tz,
        }
    }

    // ========== Placement ==========

    /// Reserve an order id ahead of placement (checkout ties the redemption to it)
    pub fn reserve_order_id(&self) -> CommerceResult<u64> {
        Ok(self.storage.reserve_order_id()?)
    }

    pub fn place_order(&self, new_order: NewOrder) -> CommerceResult<Order> {
        self.place(None, new_order, now_millis())
    }

    /// Place under an id obtained from [`Self::reserve_order_id`]
    pub fn place_reserved(&self, order_id: u64, new_order: NewOrder) -> CommerceResult<Order> {
        self.place(Some(order_id), new_order, now_millis())
    }

    /// Place with an explicit clock
    pub fn place_order_at(&self, new_order: NewOrder, now: i64) -> CommerceResult<Order> {
        self.place(None, new_order, now)
    }

    fn place(&self, reserved: Option<u64>, new_order: NewOrder, now: i64) -> CommerceResult<Order> {
        validate_new_order(&new_order)?;

        let tax = require_non_negative(new_order.tax, "tax")?;
        let shipping_cost = require_non_negative(new_order.shipping_cost, "shipping_cost")?;
        let discount = require_non_negative(new_order.gift_card_discount, "gift_card_discount")?;
        let subtotal = order_subtotal(&new_order.items);
        let total = order_total(subtotal, tax, shipping_cost, discount);
        if total < Decimal::ZERO {
            return Err(CommerceError::NegativeTotal(total));
        }

        let today = business_date(now, self.tz);
        let est_delivery_date =
            estimate_for_items(today, &new_order.items, &new_order.shipping_address, None);

        let txn = self.storage.db().begin_write()?;

        let order_id = match reserved {
            Some(id) => {
                if self.storage.order_exists_txn(&txn, id)? {
                    return Err(CommerceError::Internal(format!(
                        "order id {id} already placed"
                    )));
                }
                id
            }
            None => self.storage.next_order_id(&txn)?,
        };
        let sequence = self.storage.next_daily_sequence(&txn, today)?;

        let order = Order {
            schema_version: SCHEMA_VERSION,
            id: order_id,
            order_number: format_order_number(today, sequence),
            status: OrderStatus::Pending,
            customer_email: normalize_email(&new_order.customer_email),
            customer_name: new_order.customer_name,
            customer_phone: new_order.customer_phone,
            shipping_address: new_order.shipping_address,
            items: new_order.items,
            subtotal,
            tax,
            shipping_cost,
            gift_card_code: new_order
                .gift_card_code
                .as_deref()
                .map(normalize_gift_card_code),
            gift_card_discount: discount,
            total,
            tracking_number: None,
            carrier_name: None,
            est_delivery_date,
            created_at: now,
            updated_at: now,
        };
        let entry = OrderStatusHistory {
            schema_version: SCHEMA_VERSION,
            id: self.storage.next_history_id(&txn)?,
            order_id,
            status: OrderStatus::Pending,
            changed_by: Some(SYSTEM_ACTOR.to_string()),
            notes: Some("Order placed".to_string()),
            created_at: now,
        };

        self.storage.insert_order(&txn, &order)?;
        self.storage.append_history(&txn, &entry)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            total = %order.total,
            items = order.items.len(),
            "Order placed"
        );
        Ok(order)
    }

    // ========== Transitions ==========

    pub fn transition(&self, order_id: u64, change: StatusChange) -> CommerceResult<Order> {
        self.transition_at(order_id, change, now_millis())
    }

    /// Transition with an explicit clock
    pub fn transition_at(
        &self,
        order_id: u64,
        change: StatusChange,
        now: i64,
    ) -> CommerceResult<Order> {
        validate_optional_text(&change.changed_by, "changed_by", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&change.notes, "notes", MAX_NOTE_LEN)?;
        if let Some(cancellation) = &change.cancellation {
            if change.to != OrderStatus::Cancelled {
                return Err(CommerceError::validation(
                    "cancellation details require status cancelled",
                ));
            }
            validate_required_text(&cancellation.reason, "cancellation_reason", MAX_NOTE_LEN)?;
            validate_optional_text(&cancellation.refund_method, "refund_method", MAX_SHORT_TEXT_LEN)?;
            if let Some(amount) = cancellation.refund_amount {
                require_non_negative(amount, "refund_amount")?;
            }
        }

        let txn = self.storage.db().begin_write()?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        let from = order.status;
        check_transition(from, change.to)?;

        let notes = change.notes.clone().or_else(|| {
            change
                .cancellation
                .as_ref()
                .map(|cancellation| cancellation.reason.clone())
        });
        let entry = OrderStatusHistory {
            schema_version: SCHEMA_VERSION,
            id: self.storage.next_history_id(&txn)?,
            order_id,
            status: change.to,
            changed_by: change.changed_by.clone(),
            notes,
            created_at: now,
        };
        order.status = change.to;
        order.updated_at = now;

        self.storage.append_history(&txn, &entry)?;
        self.storage.store_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id,
            order_number = %order.order_number,
            from = %from,
            to = %order.status,
            changed_by = ?change.changed_by,
            "Order status changed"
        );

        self.notify_status_change(&order, &change);
        Ok(order)
    }

    fn notify_status_change(&self, order: &Order, change: &StatusChange) {
        let payload = match order.status {
            OrderStatus::Shipped | OrderStatus::Delivered => NotificationPayload::OrderStatusChanged {
                order_number: order.order_number.clone(),
                status: order.status,
                customer_email: order.customer_email.clone(),
                customer_name: order.customer_name.clone(),
                customer_phone: order.customer_phone.clone(),
                tracking_number: order.tracking_number.clone(),
                carrier_name: order.carrier_name.clone(),
                est_delivery_date: order.est_delivery_date,
            },
            OrderStatus::Cancelled => {
                let cancellation = change.cancellation.as_ref();
                NotificationPayload::OrderCancelled {
                    order_number: order.order_number.clone(),
                    customer_email: order.customer_email.clone(),
                    customer_name: order.customer_name.clone(),
                    cancellation_reason: cancellation
                        .map(|c| c.reason.clone())
                        .or_else(|| change.notes.clone()),
                    refund_amount: cancellation.and_then(|c| c.refund_amount),
                    refund_method: cancellation.and_then(|c| c.refund_method.clone()),
                }
            }
            OrderStatus::Pending | OrderStatus::Preparing => return,
        };
        self.notifier.enqueue(payload);
    }

    // ========== Tracking ==========

    pub fn attach_tracking(&self, order_id: u64, update: TrackingUpdate) -> CommerceResult<Order> {
        self.attach_tracking_at(order_id, update, now_millis())
    }

    /// Attach tracking with an explicit clock (the estimate counts from `now`)
    pub fn attach_tracking_at(
        &self,
        order_id: u64,
        update: TrackingUpdate,
        now: i64,
    ) -> CommerceResult<Order> {
        validate_optional_text(&update.tracking_number, "tracking_number", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&update.carrier_name, "carrier_name", MAX_SHORT_TEXT_LEN)?;

        let txn = self.storage.db().begin_write()?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Err(CommerceError::validation(format!(
                "order {} is {}, tracking can no longer change",
                order.order_number, order.status
            )));
        }

        if update.tracking_number.is_some() {
            order.tracking_number = update.tracking_number;
        }
        if update.carrier_name.is_some() {
            order.carrier_name = update.carrier_name;
        }
        if update.recompute_estimate {
            order.est_delivery_date = estimate_for_items(
                business_date(now, self.tz),
                &order.items,
                &order.shipping_address,
                order.carrier_name.as_deref(),
            );
        }
        order.updated_at = now;

        self.storage.store_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id,
            order_number = %order.order_number,
            tracking_number = ?order.tracking_number,
            carrier = ?order.carrier_name,
            est_delivery_date = ?order.est_delivery_date,
            "Tracking attached"
        );
        Ok(order)
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: u64) -> CommerceResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))
    }

    pub fn get_order_by_number(&self, order_number: &str) -> CommerceResult<Order> {
        let order_number = order_number.trim().to_uppercase();
        self.storage
            .find_by_number(&order_number)?
            .ok_or(CommerceError::OrderNotFound(order_number))
    }

    /// Status history, oldest first
    pub fn history(&self, order_id: u64) -> CommerceResult<Vec<OrderStatusHistory>> {
        self.get_order(order_id)?;
        Ok(self.storage.history_for(order_id)?)
    }

    /// Compare `order.status` with the latest history row
    pub fn verify_status_consistency(&self, order_id: u64) -> CommerceResult<StatusConsistency> {
        let order = self.get_order(order_id)?;
        let latest = self.storage.latest_history(order_id)?;
        Ok(consistency(&order, latest.as_ref()))
    }

    /// Orders whose status disagrees with their history
    pub fn verify_all(&self) -> CommerceResult<Vec<StatusConsistency>> {
        let mut mismatches = Vec::new();
        for order in self.storage.all_orders()? {
            let latest = self.storage.latest_history(order.id)?;
            let check = consistency(&order, latest.as_ref());
            if !check.consistent {
                tracing::error!(
                    order_id = order.id,
                    order_number = %order.order_number,
                    order_status = %order.status,
                    history_status = ?check.latest_history_status,
                    "Order status disagrees with history"
                );
                mismatches.push(check);
            }
        }
        Ok(mismatches)
    }
}

fn consistency(order: &Order, latest: Option<&OrderStatusHistory>) -> StatusConsistency {
    let latest_history_status = latest.map(|entry| entry.status);
    StatusConsistency {
        order_id: order.id,
        order_number: order.order_number.clone(),
        order_status: order.status,
        latest_history_status,
        consistent: latest_history_status == Some(order.status),
    }
}

fn validate_new_order(new_order: &NewOrder) -> CommerceResult<()> {
    if new_order.items.is_empty() {
        return Err(CommerceError::EmptyOrder);
    }
    for item in &new_order.items {
        validate_required_text(&item.product_name, "product_name", MAX_NAME_LEN)?;
        validate_order_item(item)?;
    }

    validate_email(&new_order.customer_email, "customer_email")?;
    validate_optional_text(&new_order.customer_name, "customer_name", MAX_NAME_LEN)?;
    validate_optional_text(&new_order.customer_phone, "customer_phone", MAX_SHORT_TEXT_LEN)?;

    let address = &new_order.shipping_address;
    validate_required_text(&address.line1, "address.line1", MAX_ADDRESS_LEN)?;
    validate_optional_text(&address.line2, "address.line2", MAX_ADDRESS_LEN)?;
    validate_required_text(&address.city, "address.city", MAX_NAME_LEN)?;
    validate_required_text(&address.state, "address.state", MAX_NAME_LEN)?;
    validate_required_text(&address.postal_code, "address.postal_code", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&address.country, "address.country", MAX_NAME_LEN)?;
    Ok(())
}

/// Latest per-item estimate: the slowest item decides the delivery date
fn estimate_for_items(
    today: NaiveDate,
    items: &[OrderItem],
    address: &ShippingAddress,
    carrier: Option<&str>,
) -> Option<NaiveDate> {
    items
        .iter()
        .map(|item| {
            estimate_from(
                today,
                &DeliveryQuery {
                    carrier,
                    city: &address.city,
                    state: &address.state,
                    country: &address.country,
                    prep_time_days: item.prep_time_days,
                    is_made_to_order: item.is_made_to_order,
                },
            )
        })
        .max()
}

#[cfg(test)]
mod tests;
