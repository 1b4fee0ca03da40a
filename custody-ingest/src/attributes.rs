use anyhow::Result;
use custody_attest_client::AttributeTuple;
use custody_keystore::KeyStore;
use dryoc::types::Bytes;
use serde_json::{Map, Value};

/// Attribute keys always emitted with `type: "str"` to enable string-index
/// queries on the attestation store, per the hoist rule's allow-list.
const STRING_INDEXED_KEYS: &[&str] = &["file_name", "asset_origin_id", "project_id"];

/// Applies the "private" hoist rule to a class-specific metadata map,
/// producing the flat attribute tuples sent to the attestation store.
///
/// A `private` map value hoists each child key to its own top-level
/// encrypted attribute; a `private` scalar value hoists under the literal
/// key `private`. The `private` key itself is never transmitted. Each
/// hoisted attribute is encrypted with a key fetched (and minted on first
/// use) from the key store, addressed by `(cid, key)`.
pub fn hoist_private_attributes(cid: &str, metadata: Map<String, Value>, keystore: &KeyStore) -> Result<Vec<AttributeTuple>> {
    let mut tuples = Vec::with_capacity(metadata.len());

    for (key, value) in metadata {
        if key == "private" {
            match value {
                Value::Object(private_map) => {
                    for (child_key, child_value) in private_map {
                        let enc_key = ensure_key(keystore, cid, &child_key)?;
                        tuples.push(AttributeTuple {
                            key: child_key,
                            value: child_value,
                            type_hint: None,
                            enc_key: Some(enc_key),
                        });
                    }
                }
                scalar => {
                    let enc_key = ensure_key(keystore, cid, "private")?;
                    tuples.push(AttributeTuple {
                        key: "private".to_string(),
                        value: scalar,
                        type_hint: None,
                        enc_key: Some(enc_key),
                    });
                }
            }
            continue;
        }

        let type_hint = STRING_INDEXED_KEYS.contains(&key.as_str()).then(|| "str".to_string());
        tuples.push(AttributeTuple {
            key,
            value,
            type_hint,
            enc_key: None,
        });
    }

    Ok(tuples)
}

fn ensure_key(keystore: &KeyStore, cid: &str, attr: &str) -> Result<String> {
    if let Some(existing) = keystore.get(cid, attr)? {
        return Ok(hex::encode(existing));
    }
    let key = custody_crypt::generate_key();
    keystore.put(cid, attr, key.as_slice())?;
    Ok(hex::encode(key.as_slice()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn private_map_hoists_each_child_as_its_own_attribute() {
        let dir = tempdir().unwrap();
        let keystore = KeyStore::new(dir.path());

        let mut metadata = Map::new();
        metadata.insert("file_name".to_string(), json!("a.txt"));
        let mut private = Map::new();
        private.insert("gps".to_string(), json!([1.0, 2.0]));
        metadata.insert("private".to_string(), Value::Object(private));

        let tuples = hoist_private_attributes("bafkreitest", metadata, &keystore).unwrap();

        assert!(tuples.iter().any(|t| t.key == "gps" && t.enc_key.is_some()));
        assert!(tuples.iter().any(|t| t.key == "file_name" && t.type_hint.as_deref() == Some("str")));
        assert!(!tuples.iter().any(|t| t.key == "private"));
    }

    #[test]
    fn private_scalar_hoists_under_the_literal_key() {
        let dir = tempdir().unwrap();
        let keystore = KeyStore::new(dir.path());

        let mut metadata = Map::new();
        metadata.insert("private".to_string(), json!("secret note"));

        let tuples = hoist_private_attributes("bafkreitest", metadata, &keystore).unwrap();

        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].key, "private");
        assert!(tuples[0].enc_key.is_some());
    }
}
