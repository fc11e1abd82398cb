//! Codec Tests
//!
//! These tests verify:
//! - Encode picks the right flag and bytes for every value type
//! - Decode reverses encode (exact, structural or numeric equality)
//! - Malformed bytes fail with the matching DecodeError
//! - Unknown flags fall back to raw text and never fail
//! - Re-encoding a decoded value decodes to the same value

use bytes::Bytes;
use flagkv::{decode, encode, BinaryTransport, Codec, DecodeError, Flag, Value};
use proptest::prelude::*;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn png_like_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x00, 0xFF, 0x0D, 0x0A, 0x00, 0x00];
    data.extend(0..=255u8);
    data.extend_from_slice(b"\\\0\r\n\0");
    data
}

fn round_trip(codec: &Codec, value: &Value) -> Value {
    let encoded = codec.encode(value);
    codec.decode(&encoded.bytes, encoded.flags()).unwrap()
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn test_nested_object_round_trip() {
    let value = Value::json(json!({"foo": "x1y2", "blah": {"bazz": ["a1", "b2"]}}));

    let encoded = encode(&value);
    assert_eq!(encoded.flag, Flag::Json);
    assert_eq!(encoded.flags(), 2);

    let decoded = decode(&encoded.bytes, encoded.flags()).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded.as_json().unwrap()["blah"]["bazz"][1], "b2");
}

#[test]
fn test_number_round_trip() {
    let value = Value::numeric(42.5).unwrap();

    let encoded = encode(&value);
    assert_eq!(encoded.flag, Flag::Numeric);
    assert_eq!(&encoded.bytes[..], b"42.5");

    let decoded = decode(&encoded.bytes, encoded.flags()).unwrap();
    assert_eq!(decoded.as_f64(), Some(42.5));
}

#[test]
fn test_text_round_trip() {
    let value = Value::raw("hello world");

    let encoded = encode(&value);
    assert_eq!(encoded.flag, Flag::Raw);
    assert_eq!(&encoded.bytes[..], "hello world".as_bytes());

    let decoded = decode(&encoded.bytes, encoded.flags()).unwrap();
    assert_eq!(decoded.as_str(), Some("hello world"));
}

#[test]
fn test_binary_round_trip_keeps_nul_and_high_bytes() {
    let data = png_like_bytes();
    let value = Value::binary(data.clone());

    let encoded = encode(&value);
    assert_eq!(encoded.flag, Flag::Binary);
    assert_eq!(&encoded.bytes[..], &data[..]);

    let decoded = decode(&encoded.bytes, encoded.flags()).unwrap();
    assert_eq!(decoded.as_bytes(), Some(&data[..]));
    assert_eq!(decoded.as_bytes().unwrap().len(), data.len());
}

#[test]
fn test_binary_round_trip_through_base64() {
    let codec = Codec::new(BinaryTransport::Base64);
    let data = png_like_bytes();
    let value = Value::binary(data.clone());

    let encoded = codec.encode(&value);
    assert_eq!(encoded.flag, Flag::Binary);
    assert!(encoded.bytes.iter().all(|b| b.is_ascii_graphic()));

    assert_eq!(round_trip(&codec, &value), value);
}

// =============================================================================
// Encoding Details
// =============================================================================

#[test]
fn test_json_decode_ignores_key_order() {
    let value = Value::json(json!({"a": 1, "b": [true, null], "c": {"d": "e"}}));
    let reordered = br#"{"c":{"d":"e"},"b":[true,null],"a":1}"#;

    assert_eq!(decode(reordered, 2).unwrap(), value);
}

#[test]
fn test_json_scalars_and_arrays() {
    for doc in [json!(null), json!(true), json!(12), json!("s"), json!([1, "two", 3.5])] {
        let value = Value::json(doc);
        assert_eq!(round_trip(&Codec::default(), &value), value);
    }
}

#[test]
fn test_json_floats_round_trip_exactly() {
    let floats = [
        1.0715660391465826e-75,
        0.1 + 0.2,
        -2.2250738585072014e-308,
        5e-324,
        1.7976931348623157e308,
        123456.78901234567,
        9007199254740992.0,
    ];
    for f in floats {
        let value = Value::json(json!([f, {"n": f}]));
        let decoded = round_trip(&Codec::default(), &value);
        assert_eq!(decoded, value, "float {:e}", f);
        assert_eq!(decoded.as_json().unwrap()[0].as_f64(), Some(f));
    }
}

#[test]
fn test_deeply_nested_json_round_trip() {
    let mut doc = json!("leaf");
    for depth in 0..500 {
        doc = if depth % 2 == 0 { json!([doc]) } else { json!({"k": doc}) };
    }
    let value = Value::json(doc);

    assert_eq!(round_trip(&Codec::default(), &value), value);
}

#[test]
fn test_number_text_forms() {
    let cases = [
        (42.0, "42"),
        (-0.5, "-0.5"),
        (1e21, "1e+21"),
        (1.5e-7, "1.5e-7"),
        (123456789.125, "123456789.125"),
    ];
    for (n, text) in cases {
        let encoded = encode(&Value::numeric(n).unwrap());
        assert_eq!(&encoded.bytes[..], text.as_bytes(), "encoding {}", n);
    }
}

#[test]
fn test_number_round_trip_extremes() {
    for n in [f64::MAX, f64::MIN, f64::MIN_POSITIVE, f64::EPSILON, 0.1 + 0.2, -0.0] {
        let value = Value::numeric(n).unwrap();
        assert_eq!(round_trip(&Codec::default(), &value).as_f64(), Some(n));
    }
}

#[test]
fn test_empty_values() {
    let codec = Codec::default();
    for value in [Value::raw(""), Value::binary(Vec::<u8>::new())] {
        let encoded = codec.encode(&value);
        assert!(encoded.bytes.is_empty());
        assert_eq!(round_trip(&codec, &value), value);
    }
}

#[test]
fn test_numeric_looking_text_stays_text() {
    let value = Value::raw("2.75");
    let encoded = encode(&value);

    assert_eq!(encoded.flag, Flag::Raw);
    assert_eq!(decode(&encoded.bytes, encoded.flags()).unwrap(), value);
    assert_eq!(decode(&encoded.bytes, 8).unwrap().as_f64(), Some(2.75));
}

// =============================================================================
// Decode Errors
// =============================================================================

#[test]
fn test_malformed_json_fails() {
    let result = decode(b"{\"foo\": ", 2);
    assert!(matches!(result, Err(DecodeError::MalformedJson(_))));
}

#[test]
fn test_malformed_number_fails() {
    let cases: [&[u8]; 7] = [b"abc", b"", b"4 2", b"42px", b"NaN", b"inf", b"\xff"];
    for bytes in cases {
        let result = decode(bytes, 8);
        assert!(
            matches!(result, Err(DecodeError::MalformedNumber(_))),
            "{:?} should not decode as a number",
            bytes
        );
    }
}

#[test]
fn test_number_decode_tolerates_surrounding_whitespace() {
    assert_eq!(decode(b" 7.25\r\n", 8).unwrap().as_f64(), Some(7.25));
}

#[test]
fn test_corrupted_base64_fails() {
    let codec = Codec::new(BinaryTransport::Base64);
    let result = codec.decode(b"iVBO!!==", 4);
    assert!(matches!(result, Err(DecodeError::BinaryTransformFailure(_))));
}

#[test]
fn test_verbatim_binary_never_fails() {
    let data = png_like_bytes();
    assert!(decode(&data, 4).is_ok());
}

// =============================================================================
// Unknown Flags
// =============================================================================

#[test]
fn test_unknown_flags_decode_as_raw() {
    for flags in [1, 3, 5, 6, 7, 9, 16, 32, 1 << 16, u32::MAX] {
        let value = decode(b"hello", flags).unwrap();
        assert_eq!(value, Value::raw("hello"), "flags {}", flags);
    }
}

#[test]
fn test_unknown_flags_with_invalid_utf8_never_fail() {
    let value = decode(&[0x89, 0x00, 0xFF, b'a'], 12345).unwrap();
    assert_eq!(value, Value::raw("\u{FFFD}\u{0}\u{FFFD}a"));
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_reencoding_decoded_json_is_stable() {
    let stored = br#"{"z":1,"a":{"y":[1,2],"b":"c"}}"#;
    let decoded = decode(stored, 2).unwrap();

    let reencoded = encode(&decoded);
    let redecoded = decode(&reencoded.bytes, reencoded.flags()).unwrap();
    assert_eq!(redecoded, decoded);
}

#[test]
fn test_reencoding_decoded_number_is_stable() {
    let decoded = decode(b"0042.50", 8).unwrap();
    let reencoded = encode(&decoded);

    assert_eq!(&reencoded.bytes[..], b"42.5");
    assert_eq!(decode(&reencoded.bytes, 8).unwrap(), decoded);
}

// =============================================================================
// Properties
// =============================================================================

fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>()
            .prop_filter("finite", |n| n.is_finite())
            .prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,12}".prop_map(serde_json::Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".*".prop_map(Value::Raw),
        arb_json().prop_map(Value::Json),
        any::<f64>()
            .prop_filter("finite", |n| n.is_finite())
            .prop_map(|n| Value::numeric(n).unwrap()),
        prop::collection::vec(any::<u8>(), 0..256).prop_map(|b| Value::Binary(Bytes::from(b))),
    ]
}

proptest! {
    #[test]
    fn prop_round_trip_identity(value in arb_value()) {
        for transport in [BinaryTransport::Verbatim, BinaryTransport::Base64] {
            let codec = Codec::new(transport);
            let encoded = codec.encode(&value);
            prop_assert_eq!(encoded.flag, value.flag());
            prop_assert_eq!(codec.decode(&encoded.bytes, encoded.flags()).unwrap(), value.clone());
        }
    }

    #[test]
    fn prop_reencode_is_idempotent(value in arb_value()) {
        let codec = Codec::default();
        let first = codec.encode(&value);
        let decoded = codec.decode(&first.bytes, first.flags()).unwrap();
        let second = codec.encode(&decoded);
        prop_assert_eq!(codec.decode(&second.bytes, second.flags()).unwrap(), decoded);
    }

    #[test]
    fn prop_unknown_flags_never_fail(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
        flags in any::<u32>().prop_filter("unknown", |f| Flag::from_bits(*f).is_none()),
    ) {
        let decoded = decode(&bytes, flags);
        prop_assert!(matches!(decoded, Ok(Value::Raw(_))));
    }
}
