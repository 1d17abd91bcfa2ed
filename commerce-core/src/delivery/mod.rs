//! Delivery Estimator
//!
//! Stateless and deterministic for a given start date. Every input has a
//! fallback (standard shipping, non-metro, non-remote), so there are no
//! error cases.

pub mod estimator;
pub mod rules;

pub use estimator::{
    DeliveryQuery, DeliveryRange, add_business_days, estimate, estimate_from, estimate_range,
    estimate_range_from, total_days, transit_days,
};
pub use rules::{MAX_PREP_TIME_DAYS, STANDARD_SHIPPING, TransitDays};
