//! Sortable encodings: string order equals value order.

use chrono::{TimeZone, Utc};
use facetdex::sortable::{
    decode_date, decode_double, decode_long, encode_date, encode_double, encode_long, label,
    token_for, ENCODED_WIDTH, TOKEN_PREFIX,
};
use facetdex::FacetKind;
use proptest::prelude::*;

fn finite_double() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>().prop_filter("finite", |v| v.is_finite()),
        Just(0.0),
        Just(-0.0),
        Just(f64::MIN_POSITIVE),
        Just(-f64::MIN_POSITIVE),
        Just(f64::MAX),
        Just(f64::MIN),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_long_order_preserved(a in any::<i64>(), b in any::<i64>()) {
        let (ea, eb) = (encode_long(a), encode_long(b));
        prop_assert_eq!(ea.len(), ENCODED_WIDTH);
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        prop_assert_eq!(decode_long(&ea), Some(a));
    }

    #[test]
    fn prop_double_order_preserved(a in finite_double(), b in finite_double()) {
        let (ea, eb) = (encode_double(a), encode_double(b));
        prop_assert_eq!(ea.len(), ENCODED_WIDTH);
        // -0.0 and 0.0 share a token, so partial_cmp agrees everywhere.
        prop_assert_eq!(a.partial_cmp(&b), Some(ea.cmp(&eb)));
        let decoded = decode_double(&ea).unwrap();
        prop_assert!(decoded == a);
    }

    #[test]
    fn prop_date_order_preserved(
        a in -62_135_596_800_000i64..253_402_300_799_000,
        b in -62_135_596_800_000i64..253_402_300_799_000,
    ) {
        let da = Utc.timestamp_millis_opt(a).unwrap();
        let db = Utc.timestamp_millis_opt(b).unwrap();
        let (ea, eb) = (encode_date(&da), encode_date(&db));
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        prop_assert_eq!(decode_date(&ea), Some(da));
    }

    #[test]
    fn prop_token_for_inverts_label(
        v in any::<i64>(),
    ) {
        let token = encode_long(v);
        let text = label(FacetKind::Long, &token);
        prop_assert_eq!(token_for(FacetKind::Long, &text), Some(token.clone()));
        // Marked tokens pass through unchanged.
        let marked = format!("{}{}", TOKEN_PREFIX, token);
        prop_assert_eq!(token_for(FacetKind::Long, &marked), Some(token));
    }
}

#[test]
fn test_nan_has_one_token() {
    let canonical = encode_double(f64::NAN);
    assert_eq!(encode_double(-f64::NAN), canonical);
    assert!(encode_double(f64::INFINITY) < canonical);
    assert!(encode_double(f64::NEG_INFINITY) < encode_double(f64::MIN));
}
