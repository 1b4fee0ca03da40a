//! Deterministic DAG-CBOR encoding for attributes and attestation-store
//! wire bodies: sorted map keys, no indefinite-length items, CIDs carried
//! under tag 42, timestamps as RFC 3339 strings rather than a CBOR tag.

use std::{collections::BTreeMap, fmt};

use anyhow::{Context, Result};
use ipld_core::cid::Cid;
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// A dynamically-typed DAG-CBOR value, the wire representation for
/// attribute values and attestation-store payload bodies.
///
/// `Text` and `Time` both serialize as a bare CBOR text string (timestamps
/// carry no CBOR tag, per the wire format this mirrors), and `Bytes` and
/// `Link` both serialize as a CBOR byte string (a `Link` additionally
/// wrapped in tag 42). Decoding can't rely on `#[serde(untagged)]`'s
/// first-variant-that-parses behavior to tell these apart — it would
/// always resolve to `Text`/`Bytes` and silently drop the other shape — so
/// `Deserialize` is implemented by hand below, sniffing the decoded
/// string/bytes to decide which variant they represent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(serde_bytes::ByteBuf),
    Array(Vec<Value>),
    /// Serialized with sorted keys; `BTreeMap`'s iteration order already
    /// matches the byte-lexicographic key order DAG-CBOR's deterministic
    /// encoding requires for string keys.
    Map(BTreeMap<String, Value>),
    /// An RFC 3339 timestamp carried as plain text, not a CBOR tag.
    Time(String),
    /// A link to another artifact, encoded under CBOR tag 42 by `ipld-core`.
    Link(Cid),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a DAG-CBOR-representable value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| de::Error::custom("integer out of i64 range"))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        self.visit_string(v.to_string())
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
        if looks_like_rfc3339(&v) {
            Ok(Value::Time(v))
        } else {
            Ok(Value::Text(v))
        }
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(bytes_to_value(v))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(bytes_to_value(&v))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut out = BTreeMap::new();
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            out.insert(k, v);
        }
        Ok(Value::Map(out))
    }
}

/// A CID's DAG-CBOR wire form is a byte string whose first byte is the
/// multibase-identity marker `0x00`, followed by the CID's binary form
/// (version, codec, multihash). Bytes matching that shape decode as a
/// `Link`; anything else is opaque `Bytes`.
fn bytes_to_value(bytes: &[u8]) -> Value {
    if let Some(rest) = bytes.strip_prefix(&[0x00]) {
        if let Ok(cid) = Cid::try_from(rest) {
            return Value::Link(cid);
        }
    }
    Value::Bytes(serde_bytes::ByteBuf::from(bytes.to_vec()))
}

/// Distinguishes a timestamp string from plain text the same way the
/// encoder distinguishes them on the way out: by RFC 3339 shape, since the
/// wire form carries both as a bare CBOR text string with no tag.
fn looks_like_rfc3339(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

/// Encodes a value to its canonical DAG-CBOR byte representation.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).context("dag-cbor encode failed")
}

/// Decodes a canonical DAG-CBOR byte representation into a value.
pub fn from_slice<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes).context("dag-cbor decode failed")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn roundtrips_a_map_with_a_link_and_a_timestamp() {
        let cid =
            Cid::from_str("bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy").unwrap();

        let mut map = BTreeMap::new();
        map.insert("sha256".to_string(), Value::Text("abc123".to_string()));
        map.insert(
            "created_at".to_string(),
            Value::Time("2026-07-28T00:00:00Z".to_string()),
        );
        map.insert("parent".to_string(), Value::Link(cid));

        let value = Value::Map(map);

        let bytes = to_vec(&value).unwrap();
        let decoded: Value = from_slice(&bytes).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn timestamp_does_not_decode_as_text() {
        let value = Value::Time("2026-07-28T00:00:00Z".to_string());
        let decoded: Value = from_slice(&to_vec(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn non_timestamp_string_decodes_as_text() {
        let value = Value::Text("abc123".to_string());
        let decoded: Value = from_slice(&to_vec(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn link_does_not_decode_as_bytes() {
        let cid = Cid::from_str("bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy").unwrap();
        let value = Value::Link(cid);
        let decoded: Value = from_slice(&to_vec(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn opaque_bytes_decode_as_bytes() {
        let value = Value::Bytes(serde_bytes::ByteBuf::from(vec![0xde, 0xad, 0xbe, 0xef]));
        let decoded: Value = from_slice(&to_vec(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn map_key_order_is_canonical_regardless_of_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), Value::Int(2));
        a.insert("a".to_string(), Value::Int(1));

        let encoded = to_vec(&Value::Map(a)).unwrap();

        // "a" (0x61 0x61) sorts before "b" (0x61 0x62); the key bytes must
        // appear in that order in the encoded map regardless of insertion order.
        let a_pos = encoded.windows(2).position(|w| w == [0x61, 0x61]).unwrap();
        let b_pos = encoded.windows(2).position(|w| w == [0x61, 0x62]).unwrap();
        assert!(a_pos < b_pos);
    }
}
