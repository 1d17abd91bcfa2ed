use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rand::Rng;

/// Prefix shared by every public-facing identifier
pub const ID_PREFIX: &str = "WZ";

/// Gift card code alphabet: uppercase, no `0/O/1/I` (32 symbols)
pub const GIFT_CARD_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Calendar date of a millisecond timestamp in the business timezone
pub fn business_date(millis: i64, tz: FixedOffset) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

/// Generate a gift card code in the `WZ-XXXX-XXXX` format.
pub fn generate_gift_card_code() -> String {
    let mut rng = rand::thread_rng();
    let mut group = || -> String {
        (0..4)
            .map(|_| GIFT_CARD_ALPHABET[rng.gen_range(0..GIFT_CARD_ALPHABET.len())] as char)
            .collect()
    };
    let first = group();
    let second = group();
    format!("{ID_PREFIX}-{first}-{second}")
}

/// Canonical form of a user-typed gift card code (trimmed, uppercase)
pub fn normalize_gift_card_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Check that a code has the `WZ-XXXX-XXXX` shape and only alphabet symbols
pub fn is_valid_gift_card_code(code: &str) -> bool {
    let mut parts = code.split('-');
    let (Some(prefix), Some(a), Some(b), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == ID_PREFIX
        && [a, b].iter().all(|group| {
            group.len() == 4 && group.bytes().all(|c| GIFT_CARD_ALPHABET.contains(&c))
        })
}

/// Format an order number: `WZ-YYYYMMDD-NNNN`
pub fn format_order_number(date: NaiveDate, sequence: u64) -> String {
    format!("{ID_PREFIX}-{}-{:04}", date.format("%Y%m%d"), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_valid() {
        for _ in 0..200 {
            let code = generate_gift_card_code();
            assert_eq!(code.len(), 12);
            assert!(is_valid_gift_card_code(&code), "bad code {code}");
            assert!(!code[3..].contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn test_code_validation() {
        assert!(is_valid_gift_card_code("WZ-ABCD-2345"));
        assert!(!is_valid_gift_card_code("WZ-ABCD-2340"));
        assert!(!is_valid_gift_card_code("WZ-ABCO-2345"));
        assert!(!is_valid_gift_card_code("XX-ABCD-2345"));
        assert!(!is_valid_gift_card_code("WZ-ABCD"));
        assert!(!is_valid_gift_card_code("WZ-ABCD-2345-EFGH"));
        assert!(!is_valid_gift_card_code("wz-abcd-2345"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_gift_card_code("  wz-abcd-2345 "), "WZ-ABCD-2345");
    }

    #[test]
    fn test_alphabet_has_no_ambiguous_symbols() {
        assert_eq!(GIFT_CARD_ALPHABET.len(), 32);
        for c in [b'0', b'O', b'1', b'I'] {
            assert!(!GIFT_CARD_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_order_number(date, 42), "WZ-20260307-0042");
        assert_eq!(format_order_number(date, 12345), "WZ-20260307-12345");
    }

    #[test]
    fn test_business_date_offset() {
        // 2026-01-01T20:00:00Z is already Jan 2nd in IST (+05:30)
        let millis = 1_767_297_600_000;
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        assert_eq!(
            business_date(millis, ist),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
        );
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            business_date(millis, utc),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }
}
