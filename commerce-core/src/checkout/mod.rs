//! Checkout flow
//!
//! ```text
//! checkout(request)
//!     ├─ 1. reserve order id
//!     ├─ 2. redeem gift card (discount = min(balance, payable))
//!     ├─ 3. place order (pending) under the reserved id
//!     │      └─ failure → refund the redemption, return the error
//!     └─ 4. mark the customer's abandoned cart recovered (failure logged only)
//! ```

use crate::carts::CartReconciler;
use crate::gift_cards::GiftCardLedger;
use crate::money::{order_subtotal, order_total};
use crate::orders::FulfillmentManager;
use crate::utils::{CommerceError, CommerceResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{GiftCard, NewOrder, Order};
use shared::util::{normalize_gift_card_code, now_millis};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// `gift_card_code` / `gift_card_discount` of the order are filled in here
    pub order: NewOrder,
    pub gift_card_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    /// Card state after redemption
    pub gift_card: Option<GiftCard>,
    pub carts_recovered: usize,
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    ledger: GiftCardLedger,
    orders: FulfillmentManager,
    carts: CartReconciler,
}

impl CheckoutService {
    pub fn new(ledger: GiftCardLedger, orders: FulfillmentManager, carts: CartReconciler) -> Self {
        Self {
            ledger,
            orders,
            carts,
        }
    }

    pub fn checkout(&self, request: CheckoutRequest) -> CommerceResult<CheckoutReceipt> {
        let CheckoutRequest {
            mut order,
            gift_card_code,
        } = request;
        if order.items.is_empty() {
            return Err(CommerceError::EmptyOrder);
        }

        let order_id = self.orders.reserve_order_id()?;

        let mut redeemed: Option<(String, Decimal, GiftCard)> = None;
        if let Some(code) = gift_card_code.as_deref().map(normalize_gift_card_code) {
            let payable = order_total(
                order_subtotal(&order.items),
                order.tax,
                order.shipping_cost,
                Decimal::ZERO,
            );
            let card = self.ledger.lookup(&code)?;
            let discount = card.current_balance.min(payable);

            if discount > Decimal::ZERO {
                let card = self.ledger.redeem(&code, discount, Some(order_id))?;
                redeemed = Some((code.clone(), discount, card));
                order.gift_card_code = Some(code);
                order.gift_card_discount = discount;
            } else {
                // nothing to redeem; the card is still checked but not attached
                if !card.is_active {
                    return Err(CommerceError::GiftCardNotFound(code));
                }
                if card.is_expired_at(now_millis()) {
                    return Err(CommerceError::Expired(code));
                }
                order.gift_card_code = None;
                order.gift_card_discount = Decimal::ZERO;
            }
        } else {
            order.gift_card_code = None;
            order.gift_card_discount = Decimal::ZERO;
        }

        let customer_email = order.customer_email.clone();
        let placed = match self.orders.place_reserved(order_id, order) {
            Ok(placed) => placed,
            Err(e) => {
                if let Some((code, amount, _)) = &redeemed {
                    self.compensate(code, *amount, order_id);
                }
                return Err(e);
            }
        };

        let carts_recovered = match self.carts.mark_recovered(&customer_email) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    order_number = %placed.order_number,
                    error = %e,
                    "Failed to mark abandoned cart recovered"
                );
                0
            }
        };

        tracing::info!(
            order_id = placed.id,
            order_number = %placed.order_number,
            gift_card_discount = %placed.gift_card_discount,
            carts_recovered,
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            order: placed,
            gift_card: redeemed.map(|(_, _, card)| card),
            carts_recovered,
        })
    }

    /// Give back a redemption whose order was never placed
    fn compensate(&self, code: &str, amount: Decimal, order_id: u64) {
        match self.ledger.refund(code, amount, Some(order_id)) {
            Ok(card) => tracing::warn!(
                code = %code,
                amount = %amount,
                order_id,
                balance = %card.current_balance,
                "Order placement failed, gift card redemption refunded"
            ),
            Err(e) => tracing::error!(
                code = %code,
                amount = %amount,
                order_id,
                error = %e,
                "Order placement failed and the redemption could not be refunded"
            ),
        }
    }
}
