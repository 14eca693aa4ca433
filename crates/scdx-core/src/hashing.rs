//! Content hashing for desired entries.
//!
//! Provides the deterministic SHA256 digest used to decide whether a desired
//! entry is already present among the active records.
//!
//! ## Field selection
//!
//! - `pick`: hash exactly the listed fields (absent fields are skipped)
//! - `omit`: hash everything except the listed fields
//! - neither: hash the whole entry
//!
//! `pick` wins when both are set. Configuring either one enables
//! field-mutation mode: a hash match no longer implies identical payloads.
//!
//! ## Determinism Guarantees
//!
//! - Object keys are sorted at every nesting level before hashing
//! - Same included fields → same digest, regardless of insertion order
//! - Array order is significant

use crate::errors::Result;
use crate::model::{ContentHash, DesiredEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Field selection applied before hashing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omit: Option<Vec<String>>,
}

impl HashingConfig {
    /// Hash the whole entry
    pub fn whole_entry() -> Self {
        Self::default()
    }

    /// Hash only the given fields
    pub fn pick<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pick: Some(fields.into_iter().map(Into::into).collect()),
            omit: None,
        }
    }

    /// Hash everything except the given fields
    pub fn omit<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pick: None,
            omit: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// True when the hash may ignore fields that can still differ
    pub fn field_mutation_enabled(&self) -> bool {
        self.pick.is_some() || self.omit.is_some()
    }
}

/// Compute the content hash of an entry.
///
/// ## Returns
///
/// Hex-encoded SHA256 digest (64 characters)
///
/// ## Errors
///
/// Returns `ScdxError::Serialization` if canonical serialization fails.
///
/// ## Example
///
/// ```
/// use scdx_core::hashing::{compute_hash, HashingConfig};
/// use scdx_core::model::DesiredEntry;
/// use serde_json::json;
///
/// let a: DesiredEntry = serde_json::from_value(json!({"a": 1, "b": 2, "c": 3})).unwrap();
/// let b: DesiredEntry = serde_json::from_value(json!({"b": 2, "a": 1, "c": 99})).unwrap();
/// let config = HashingConfig::pick(["a", "b"]);
/// assert_eq!(compute_hash(&a, &config).unwrap(), compute_hash(&b, &config).unwrap());
/// ```
pub fn compute_hash(entry: &DesiredEntry, config: &HashingConfig) -> Result<ContentHash> {
    let projected = project(entry, config);
    let canonical = canonical_json(&Value::Object(projected))?;
    Ok(ContentHash::new(hash_string(&canonical)))
}

/// Restrict an entry to the fields that take part in the hash
fn project(entry: &DesiredEntry, config: &HashingConfig) -> Map<String, Value> {
    let fields = entry.as_map();
    if let Some(pick) = &config.pick {
        pick.iter()
            .filter_map(|name| fields.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    } else if let Some(omit) = &config.omit {
        fields
            .iter()
            .filter(|(name, _)| !omit.iter().any(|o| o == *name))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect()
    } else {
        fields.clone()
    }
}

/// Serialize a JSON value with object keys sorted at every level.
///
/// Does not rely on the iteration order of `serde_json::Map`, which changes
/// when the `preserve_order` feature is enabled anywhere in the build.
///
/// ## Errors
///
/// Returns `ScdxError::Serialization` if a scalar cannot be serialized.
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Hash a string using SHA256.
fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> DesiredEntry {
        DesiredEntry::from_value(value, 0).unwrap()
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let h = compute_hash(&entry(json!({"a": 1})), &HashingConfig::whole_entry()).unwrap();
        assert_eq!(h.as_str().len(), 64);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let v = json!({"b": {"z": 1, "y": [ {"d": 1, "c": 2} ]}, "a": null});
        assert_eq!(
            canonical_json(&v).unwrap(),
            r#"{"a":null,"b":{"y":[{"c":2,"d":1}],"z":1}}"#
        );
    }

    #[test]
    fn test_field_order_independent() {
        let mut a = DesiredEntry::default();
        a.set("x", json!(1));
        a.set("y", json!("two"));
        let mut b = DesiredEntry::default();
        b.set("y", json!("two"));
        b.set("x", json!(1));
        let config = HashingConfig::whole_entry();
        assert_eq!(compute_hash(&a, &config).unwrap(), compute_hash(&b, &config).unwrap());
    }

    #[test]
    fn test_pick_ignores_other_fields() {
        let config = HashingConfig::pick(["a", "b"]);
        let h1 = compute_hash(&entry(json!({"a": 1, "b": 2, "c": 3})), &config).unwrap();
        let h2 = compute_hash(&entry(json!({"a": 1, "b": 2, "c": 4})), &config).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_pick_skips_absent_fields() {
        let config = HashingConfig::pick(["a", "missing"]);
        let h1 = compute_hash(&entry(json!({"a": 1})), &config).unwrap();
        let h2 = compute_hash(&entry(json!({"a": 1})), &HashingConfig::whole_entry()).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_absent_field_differs_from_null() {
        let config = HashingConfig::pick(["a"]);
        let h1 = compute_hash(&entry(json!({})), &config).unwrap();
        let h2 = compute_hash(&entry(json!({"a": null})), &config).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_omit_removes_fields() {
        let config = HashingConfig::omit(["note"]);
        let h1 = compute_hash(&entry(json!({"v": "x", "note": "old"})), &config).unwrap();
        let h2 = compute_hash(&entry(json!({"v": "x", "note": "new"})), &config).unwrap();
        let h3 = compute_hash(&entry(json!({"v": "y", "note": "old"})), &config).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_pick_takes_precedence_over_omit() {
        let config = HashingConfig {
            pick: Some(vec!["v".to_string()]),
            omit: Some(vec!["v".to_string()]),
        };
        let h1 = compute_hash(&entry(json!({"v": "x", "w": 1})), &config).unwrap();
        let h2 = compute_hash(&entry(json!({"v": "y", "w": 1})), &config).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_field_mutation_mode() {
        assert!(!HashingConfig::whole_entry().field_mutation_enabled());
        assert!(HashingConfig::pick(["a"]).field_mutation_enabled());
        assert!(HashingConfig::omit(Vec::<String>::new()).field_mutation_enabled());
    }
}
