//! Money helpers using rust_decimal for precision
//!
//! Every stored amount is rounded to 2 decimal places (half away from zero)
//! before it is compared or persisted.

use crate::delivery::MAX_PREP_TIME_DAYS;
use crate::utils::{CommerceError, CommerceResult};
use rust_decimal::prelude::*;
use shared::models::{CartLine, OrderItem};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed single amount (₹10,000,000)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 2);

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Round to the stored precision
#[inline]
pub fn to_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount must be > 0 and within range; returns the rounded value
pub fn require_positive(value: Decimal, field: &str) -> CommerceResult<Decimal> {
    let value = to_money(value);
    if value <= Decimal::ZERO {
        return Err(CommerceError::validation(format!(
            "{field} must be positive, got {value}"
        )));
    }
    require_in_range(value, field)
}

/// Amount must be >= 0 and within range; returns the rounded value
pub fn require_non_negative(value: Decimal, field: &str) -> CommerceResult<Decimal> {
    let value = to_money(value);
    if value < Decimal::ZERO {
        return Err(CommerceError::validation(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    require_in_range(value, field)
}

fn require_in_range(value: Decimal, field: &str) -> CommerceResult<Decimal> {
    if value > MAX_AMOUNT {
        return Err(CommerceError::validation(format!(
            "{field} exceeds maximum allowed ({MAX_AMOUNT}), got {value}"
        )));
    }
    Ok(value)
}

fn require_quantity(quantity: u32, field: &str) -> CommerceResult<()> {
    if quantity == 0 {
        return Err(CommerceError::validation(format!(
            "{field} quantity must be positive"
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(CommerceError::validation(format!(
            "{field} quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        )));
    }
    Ok(())
}

/// Validate one order item snapshot
pub fn validate_order_item(item: &OrderItem) -> CommerceResult<()> {
    require_quantity(item.quantity, &item.product_name)?;
    require_non_negative(item.unit_price, "unit_price")?;
    if let Some(days) = item.prep_time_days
        && days > MAX_PREP_TIME_DAYS
    {
        return Err(CommerceError::validation(format!(
            "{} prep_time_days exceeds maximum allowed ({MAX_PREP_TIME_DAYS}), got {days}",
            item.product_name
        )));
    }
    Ok(())
}

/// Validate one cart line
pub fn validate_cart_line(line: &CartLine) -> CommerceResult<()> {
    require_quantity(line.quantity, &line.product_name)?;
    require_non_negative(line.unit_price, "unit_price")?;
    Ok(())
}

/// `unit_price * quantity`, rounded
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    to_money(unit_price * Decimal::from(quantity))
}

/// Sum of the item snapshot
pub fn order_subtotal(items: &[OrderItem]) -> Decimal {
    to_money(
        items
            .iter()
            .map(|item| line_total(item.unit_price, item.quantity))
            .sum(),
    )
}

/// Sum of the cart lines
pub fn cart_subtotal(lines: &[CartLine]) -> Decimal {
    to_money(
        lines
            .iter()
            .map(|line| line_total(line.unit_price, line.quantity))
            .sum(),
    )
}

/// `subtotal + tax + shipping - discount`; may be negative, caller rejects
pub fn order_total(
    subtotal: Decimal,
    tax: Decimal,
    shipping_cost: Decimal,
    discount: Decimal,
) -> Decimal {
    to_money(subtotal + tax + shipping_cost - discount)
}
