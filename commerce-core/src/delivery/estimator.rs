//! Delivery date estimation
//!
//! ```text
//! total_days = prep_days + transit_days
//!
//! prep_days    = prep_time_days (default 7) if made-to-order, else 1
//! transit_days = carrier table (domestic | international)
//!                domestic only: metro city -1 (min 1), else remote state +3
//! ```
//!
//! The date is found by walking forward from the start date one calendar
//! day at a time and counting every day except Sunday. Saturdays count.

use chrono::{Datelike, Days, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use shared::util::{business_date, now_millis};

use super::rules::{
    DEFAULT_PREP_TIME_DAYS, MAX_PREP_TIME_DAYS, RANGE_BUFFER_DAYS, READY_STOCK_PREP_DAYS, carrier_transit,
    is_domestic, is_metro_city, is_remote_state,
};

/// Estimator inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryQuery<'a> {
    /// `None` or an unknown name means standard shipping
    pub carrier: Option<&'a str>,
    pub city: &'a str,
    pub state: &'a str,
    pub country: &'a str,
    /// Only used for made-to-order products
    pub prep_time_days: Option<u32>,
    pub is_made_to_order: bool,
}

/// Customer-facing delivery window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DeliveryRange {
    /// e.g. `Oct 22 - Oct 24, 2026` or `Dec 30, 2026 - Jan 2, 2027`
    pub fn display(&self) -> String {
        if self.earliest.year() == self.latest.year() {
            format!(
                "{} - {}",
                self.earliest.format("%b %-d"),
                self.latest.format("%b %-d, %Y")
            )
        } else {
            format!(
                "{} - {}",
                self.earliest.format("%b %-d, %Y"),
                self.latest.format("%b %-d, %Y")
            )
        }
    }
}

/// Carrier transit days after the regional adjustment
pub fn transit_days(query: &DeliveryQuery<'_>) -> u32 {
    let table = carrier_transit(query.carrier);

    if !is_domestic(query.country) {
        return table.international;
    }

    if is_metro_city(query.city) {
        table.domestic.saturating_sub(1).max(1)
    } else if is_remote_state(query.state) {
        table.domestic + 3
    } else {
        table.domestic
    }
}

/// Preparation days, capped at [`MAX_PREP_TIME_DAYS`]
pub fn prep_days(query: &DeliveryQuery<'_>) -> u32 {
    if query.is_made_to_order {
        query
            .prep_time_days
            .unwrap_or(DEFAULT_PREP_TIME_DAYS)
            .min(MAX_PREP_TIME_DAYS)
    } else {
        READY_STOCK_PREP_DAYS
    }
}

pub fn total_days(query: &DeliveryQuery<'_>) -> u32 {
    prep_days(query).saturating_add(transit_days(query))
}

/// Walk forward from `start`, counting every non-Sunday day until `days` are counted
///
/// Stops at the last representable date.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut date = start;
    let mut counted = 0;
    while counted < days {
        let Some(next) = date.checked_add_days(Days::new(1)) else {
            break;
        };
        date = next;
        if date.weekday() != Weekday::Sun {
            counted += 1;
        }
    }
    date
}

/// Expected delivery date counted from `today`
pub fn estimate_from(today: NaiveDate, query: &DeliveryQuery<'_>) -> NaiveDate {
    add_business_days(today, total_days(query))
}

/// Expected delivery date counted from today in the business timezone
pub fn estimate(query: &DeliveryQuery<'_>, tz: FixedOffset) -> NaiveDate {
    estimate_from(business_date(now_millis(), tz), query)
}

/// Range variant: the upper bound carries a further buffer for display
pub fn estimate_range_from(today: NaiveDate, query: &DeliveryQuery<'_>) -> DeliveryRange {
    let days = total_days(query);
    DeliveryRange {
        earliest: add_business_days(today, days),
        latest: add_business_days(today, days.saturating_add(RANGE_BUFFER_DAYS)),
    }
}

pub fn estimate_range(query: &DeliveryQuery<'_>, tz: FixedOffset) -> DeliveryRange {
    estimate_range_from(business_date(now_millis(), tz), query)
}
