//! # TideDB Codec
//!
//! The value model behind TideDB documents and the deterministic binary form
//! used wherever a value must become a key.
//!
//! Index postings and watch topics are keyed by the encoding of an indexed
//! value, so two equal values must always encode to the same bytes. The
//! encoding is CBOR (RFC 8949) restricted to its core deterministic subset:
//!
//! - heads use the shortest argument width
//! - map entries are ordered by the bytewise order of their encoded keys
//! - floats are written as 64-bit, with `-0.0` folded into `0.0`
//! - NaN, infinities, tags and indefinite lengths never appear
//!
//! [`from_cbor`] accepts exactly that subset and nothing else.
//!
//! ```
//! use tidedb_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let doc = Value::from_json(serde_json::json!({"b": "c", "a": [1, 2.5]}));
//! let bytes = to_canonical_cbor(&doc).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), doc);
//! assert_eq!(doc.to_json().unwrap()["b"], "c");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used))]

mod decoder;
mod encoder;
mod error;
mod json;
mod value;

pub use decoder::from_cbor;
pub use encoder::to_canonical_cbor;
pub use error::{CodecError, CodecResult};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nested_document_survives_storage() {
        let value = Value::object([
            (
                "users",
                Value::Array(vec![
                    Value::object([("name", Value::from("Alice")), ("age", Value::from(30i64))]),
                    Value::object([("name", Value::from("Bob")), ("score", Value::from(7.25))]),
                ]),
            ),
            ("count", Value::from(2i64)),
            ("raw", Value::Bytes(vec![0, 1, 2])),
            ("none", Value::Null),
        ]);
        let bytes = to_canonical_cbor(&value).unwrap();
        assert_eq!(from_cbor(&bytes).unwrap(), value);
    }

    #[test]
    fn equal_json_serializes_identically() {
        let a = Value::from_json(serde_json::json!({"x": 1, "y": [true, null]}));
        let b = Value::from_json(serde_json::json!({"y": [true, null], "x": 1}));
        assert_eq!(to_canonical_cbor(&a).unwrap(), to_canonical_cbor(&b).unwrap());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            (-1.0e12f64..1.0e12).prop_map(Value::Float),
            ".{0,12}".prop_map(Value::Text),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        ];
        leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::object(m)),
            ]
        })
    }

    proptest! {
        #[test]
        fn entry_order_never_changes_bytes(
            entries in prop::collection::btree_map("[a-z]{1,4}", any::<i64>(), 0..6)
        ) {
            let forward: Vec<(Value, Value)> = entries
                .iter()
                .map(|(k, v)| (Value::from(k.as_str()), Value::Integer(*v)))
                .collect();
            let mut backward = forward.clone();
            backward.reverse();
            prop_assert_eq!(
                to_canonical_cbor(&Value::Map(forward)).unwrap(),
                to_canonical_cbor(&Value::Map(backward)).unwrap()
            );
        }

        #[test]
        fn encoding_is_a_fixed_point(value in arb_value()) {
            let bytes = to_canonical_cbor(&value).unwrap();
            let decoded = from_cbor(&bytes).unwrap();
            prop_assert_eq!(to_canonical_cbor(&decoded).unwrap(), bytes);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = from_cbor(&bytes);
        }
    }
}
