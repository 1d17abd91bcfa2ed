//! Static delivery rules: carrier transit table, metro cities, remote states

/// Transit days for one carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitDays {
    pub domestic: u32,
    pub international: u32,
}

/// Fallback carrier for unknown / missing carrier names
pub const STANDARD_SHIPPING: &str = "Standard Shipping";

/// Country treated as domestic (case-insensitive)
pub const DOMESTIC_COUNTRY: &str = "India";

/// Preparation days for made-to-order products without an explicit value
pub const DEFAULT_PREP_TIME_DAYS: u32 = 7;

/// Upper bound accepted for `prep_time_days`
pub const MAX_PREP_TIME_DAYS: u32 = 365;

/// Preparation days for ready-stock products
pub const READY_STOCK_PREP_DAYS: u32 = 1;

/// Extra days added to the upper bound of a customer-facing range
pub const RANGE_BUFFER_DAYS: u32 = 2;

const CARRIERS: &[(&str, TransitDays)] = &[
    ("BlueDart", TransitDays { domestic: 3, international: 7 }),
    ("DTDC", TransitDays { domestic: 5, international: 10 }),
    ("Delhivery", TransitDays { domestic: 4, international: 8 }),
    ("India Post", TransitDays { domestic: 7, international: 15 }),
    ("Ecom Express", TransitDays { domestic: 5, international: 10 }),
    ("FedEx", TransitDays { domestic: 3, international: 6 }),
    ("DHL", TransitDays { domestic: 3, international: 6 }),
    (STANDARD_SHIPPING, TransitDays { domestic: 5, international: 12 }),
];

const METRO_CITIES: &[&str] = &[
    "Mumbai",
    "Delhi",
    "New Delhi",
    "Bangalore",
    "Bengaluru",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Pune",
    "Ahmedabad",
];

const REMOTE_STATES: &[&str] = &[
    "Jammu and Kashmir",
    "Ladakh",
    "Himachal Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Sikkim",
    "Tripura",
    "Andaman and Nicobar Islands",
    "Lakshadweep",
];

fn matches(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b)
}

/// Transit table entry for a carrier; unknown carriers fall back to standard shipping
pub fn carrier_transit(carrier: Option<&str>) -> TransitDays {
    let standard = CARRIERS
        .iter()
        .find(|(name, _)| *name == STANDARD_SHIPPING)
        .map(|(_, days)| *days)
        .unwrap_or(TransitDays {
            domestic: 5,
            international: 12,
        });

    match carrier {
        Some(name) => CARRIERS
            .iter()
            .find(|(known, _)| matches(name, known))
            .map(|(_, days)| *days)
            .unwrap_or(standard),
        None => standard,
    }
}

pub fn is_domestic(country: &str) -> bool {
    matches(country, DOMESTIC_COUNTRY)
}

pub fn is_metro_city(city: &str) -> bool {
    METRO_CITIES.iter().any(|metro| matches(city, metro))
}

pub fn is_remote_state(state: &str) -> bool {
    REMOTE_STATES.iter().any(|remote| matches(state, remote))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_carriers() {
        assert_eq!(carrier_transit(Some("BlueDart")).domestic, 3);
        assert_eq!(carrier_transit(Some("DTDC")).domestic, 5);
        assert_eq!(carrier_transit(Some("dtdc ")).international, 10);
    }

    #[test]
    fn test_unknown_carrier_falls_back() {
        let standard = carrier_transit(Some(STANDARD_SHIPPING));
        assert_eq!(carrier_transit(Some("Pigeon Express")), standard);
        assert_eq!(carrier_transit(None), standard);
    }

    #[test]
    fn test_lookups_ignore_case() {
        assert!(is_domestic("india"));
        assert!(is_domestic(" INDIA "));
        assert!(!is_domestic("Nepal"));
        assert!(is_metro_city("mumbai"));
        assert!(!is_metro_city("Leh"));
        assert!(is_remote_state("ladakh"));
        assert!(!is_remote_state("Maharashtra"));
    }
}
