use binjson::binary::marker;
use binjson::binary::system_strings::SYSTEM_STRINGS;
use binjson::{
    decode, decode_with, encode, encode_with, DecodeErrorKind, DecoderOptions, EncoderOptions,
    JsonValue, Number64,
};
use bytes::Bytes;
use proptest::prelude::*;
use uuid::Uuid;

fn round_trip(value: &JsonValue) -> JsonValue {
    let bytes = encode(value).unwrap();
    decode(bytes).unwrap()
}

fn assert_round_trip(value: JsonValue) {
    assert_eq!(round_trip(&value), value, "value {value:?}");
}

#[test]
fn scalars() {
    assert_round_trip(JsonValue::Null);
    assert_round_trip(JsonValue::Bool(true));
    assert_round_trip(JsonValue::Bool(false));
}

#[test]
fn integer_boundaries() {
    for i in [
        -1i64,
        0,
        31,
        32,
        127,
        -128,
        255,
        256,
        32767,
        -32768,
        i64::from(i32::MAX),
        i64::from(i32::MIN),
        i64::MAX,
        i64::MIN,
    ] {
        let decoded = round_trip(&i.into());
        assert_eq!(decoded, JsonValue::Number(Number64::Integer(i)));
        assert!(decoded.as_number().unwrap().is_integer());
    }
}

#[test]
fn literal_boundary() {
    assert_eq!(encode(&0.into()).unwrap().len(), 1);
    assert_eq!(encode(&31.into()).unwrap().len(), 1);
    assert!(encode(&32.into()).unwrap().len() > 1);
    assert!(encode(&(-1).into()).unwrap().len() > 1);
}

#[test]
fn doubles() {
    for d in [
        -0.5,
        0.1,
        f64::MAX,
        f64::MIN,
        f64::MIN_POSITIVE,
        5e-324,
        f64::INFINITY,
        f64::NEG_INFINITY,
        -0.0,
        1e19,
    ] {
        let Some(Number64::Double(back)) = round_trip(&d.into()).as_number() else {
            panic!("{d} did not decode as a double");
        };
        assert_eq!(back.to_bits(), d.to_bits());
    }

    let Some(Number64::Double(nan)) = round_trip(&f64::NAN.into()).as_number() else {
        panic!("NaN did not decode as a double");
    };
    assert!(nan.is_nan());
}

#[test]
fn integral_doubles_compare_equal() {
    for d in [0.0, 3.0, -42.0, 9.007_199_254_740_992e15] {
        let decoded = round_trip(&d.into());
        assert_eq!(decoded, JsonValue::from(d));
        assert!(decoded.as_number().unwrap().is_integer());
    }
}

#[test]
fn strings() {
    let mut cases: Vec<String> = vec![
        String::new(),
        "foo".into(),
        "0123456789abcdef".into(),
        "0123456789ABCDEF".into(),
        "2024-01-15T10:30:00.000Z".into(),
        "2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e42".into(),
        "2EA9F1D6-5B4C-4F0A-9E3D-7C1B8A6F0E42".into(),
        "\"2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e42\"".into(),
        "2ea9f1d6-5b4c-4f0a-9e3d-7C1B8A6F0E42".into(),
        "aaaabbbbccccdddd".into(),
        "THE QUICK BROWN FOX".into(),
        "Hello, World! 123".into(),
        "x".repeat(1000),
        "\u{e9}t\u{e9} \u{1F600}".into(),
        "q".repeat(70_000),
    ];
    cases.extend(SYSTEM_STRINGS.iter().map(|s| s.to_string()));
    for s in cases {
        assert_round_trip(s.as_str().into());
    }
}

#[test]
fn guid_strings_use_fast_path() {
    let lower = encode(&"2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e42".into()).unwrap();
    assert_eq!(lower[0], marker::LOWERCASE_GUID_STRING);
    assert_eq!(lower.len(), 17);
    let upper = encode(&"2EA9F1D6-5B4C-4F0A-9E3D-7C1B8A6F0E42".into()).unwrap();
    assert_eq!(upper[0], marker::UPPERCASE_GUID_STRING);
    let mixed = encode(&"2ea9f1d6-5b4c-4f0a-9e3d-7C1B8A6F0E42".into()).unwrap();
    assert!(!marker::is_guid_string(mixed[0]));
}

#[test]
fn system_strings_are_one_byte() {
    for (id, s) in SYSTEM_STRINGS.iter().enumerate() {
        let bytes = encode(&(*s).into()).unwrap();
        assert_eq!(&bytes[..], &[0x20 + id as u8], "system string {s}");
    }
}

#[test]
fn typed_values() {
    let guid = Uuid::new_v4();
    for value in [
        JsonValue::Int8(i8::MIN),
        JsonValue::Int16(i16::MAX),
        JsonValue::Int32(-7),
        JsonValue::Int64(i64::MIN),
        JsonValue::UInt32(u32::MAX),
        JsonValue::Float32(1.5),
        JsonValue::Float64(-2.25),
        JsonValue::Guid(guid),
        JsonValue::Binary(Bytes::from_static(b"\x00\x01\x02")),
        JsonValue::Binary(Bytes::from(vec![7u8; 300])),
    ] {
        assert_round_trip(value);
    }
}

#[test]
fn containers() {
    assert_round_trip(JsonValue::Array(vec![]));
    assert_round_trip(JsonValue::Array(vec![1.into()]));
    assert_round_trip(JsonValue::Array((0..1000).map(JsonValue::from).collect()));
    assert_round_trip(JsonValue::Object(vec![]));
    assert_round_trip(JsonValue::object([("a", 1.into())]));
    assert_round_trip(JsonValue::object([
        ("id", "doc-1".into()),
        ("_ts", 1_700_000_000.into()),
        ("tags", JsonValue::Array(vec!["a".into(), "b".into()])),
        ("dup", 1.into()),
        ("dup", 2.into()),
    ]));
}

#[test]
fn linked_list() {
    let list = (0..200).fold(JsonValue::Null, |next, i| {
        JsonValue::object([("value", JsonValue::from(i)), ("next", next)])
    });
    let bytes = encode(&list).unwrap();
    assert_eq!(decode_with(bytes.clone(), DecoderOptions::default().max_depth(200)).unwrap(), list);
    let err = decode(bytes).unwrap_err();
    assert_eq!(err.decode_kind(), Some(DecodeErrorKind::InvalidToken));
}

#[test]
fn many_property_names() {
    let objects: Vec<JsonValue> = (0..2)
        .map(|_| {
            JsonValue::Object(
                (0..2100)
                    .map(|i| (format!("prop{i}").into(), JsonValue::from(i)))
                    .collect(),
            )
        })
        .collect();
    assert_round_trip(JsonValue::Array(objects));
}

#[test]
fn every_option_combination() {
    let long = "repeated string value that is long enough";
    let value = JsonValue::Array(vec![
        JsonValue::object([("name", long.into()), ("other", long.into())]),
        JsonValue::object([("name", long.into()), ("other", "0123456789abcdef".into())]),
        JsonValue::Array((0..300).map(|i| JsonValue::from(i * 1000)).collect()),
    ]);
    for bits in 0..16u8 {
        let options = EncoderOptions::default()
            .user_strings(bits & 1 != 0)
            .compress_strings(bits & 2 != 0)
            .reference_strings(bits & 4 != 0)
            .container_counts(bits & 8 != 0);
        let bytes = encode_with(&value, options).unwrap();
        assert_eq!(decode(bytes).unwrap(), value, "options {bits:04b}");
    }
}

#[test]
fn invalid_marker_is_rejected() {
    let err = decode(Bytes::from_static(&[0xFF])).unwrap_err();
    assert_eq!(err.decode_kind(), Some(DecodeErrorKind::InvalidTypeMarker));
}

fn arb_value() -> impl Strategy<Value = JsonValue> {
    let leaf = prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::Bool),
        any::<i64>().prop_map(JsonValue::from),
        (-1e12f64..1e12).prop_map(JsonValue::from),
        "[a-zA-Z0-9 _:.-]{0,80}".prop_map(|s| JsonValue::from(s.as_str())),
        "[0-9a-f]{1,40}".prop_map(|s| JsonValue::from(s.as_str())),
        any::<u32>().prop_map(JsonValue::UInt32),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(JsonValue::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..8).prop_map(JsonValue::object),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

    #[test]
    fn random_documents_round_trip(
        value in arb_value(),
        refs in any::<bool>(),
        counts in any::<bool>()
    ) {
        let options = EncoderOptions::default().reference_strings(refs).container_counts(counts);
        let bytes = encode_with(&value, options).unwrap();
        prop_assert_eq!(decode(bytes).unwrap(), value);
    }
}
