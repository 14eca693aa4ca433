//! Partition key strategies
//!
//! The key groups records for filtering (scope filters, history queries). It
//! never takes part in identity: two entries with different keys but equal
//! hashes still match the same active record.

use crate::errors::{Result, ScdxError};
use crate::hashing::canonical_json;
use crate::model::{DesiredEntry, PartitionKey};
use serde_json::Value;

/// Strategy deriving a partition key from a desired entry
///
/// Implementations must be pure: the same entry always yields the same key.
pub trait KeyingStrategy: Send + Sync {
    /// Derive the key for an entry
    fn key(&self, entry: &DesiredEntry) -> PartitionKey;

    /// Human-readable description for logs and `Debug` output
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

/// Strategy used when nothing is configured: every entry gets `"default"`
///
/// # Example
/// ```
/// use scdx_core::keying::{DefaultKeying, KeyingStrategy};
/// use scdx_core::model::DesiredEntry;
///
/// assert_eq!(DefaultKeying.key(&DesiredEntry::default()).as_str(), "default");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeying;

impl KeyingStrategy for DefaultKeying {
    fn key(&self, _entry: &DesiredEntry) -> PartitionKey {
        PartitionKey::default()
    }

    fn describe(&self) -> String {
        "default".to_string()
    }
}

/// Key built from top-level fields joined by a separator
///
/// Strings are used verbatim, other values as canonical JSON, absent fields
/// as the empty string.
#[derive(Debug, Clone)]
pub struct FieldKeying {
    fields: Vec<String>,
    separator: String,
}

impl FieldKeying {
    pub const DEFAULT_SEPARATOR: &'static str = ":";

    /// # Errors
    ///
    /// Returns `EmptyKeyingFields` when `fields` is empty.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(ScdxError::EmptyKeyingFields);
        }
        Ok(Self {
            fields,
            separator: Self::DEFAULT_SEPARATOR.to_string(),
        })
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    fn render(value: Option<&Value>) -> String {
        match value {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => canonical_json(other).unwrap_or_default(),
        }
    }
}

impl KeyingStrategy for FieldKeying {
    fn key(&self, entry: &DesiredEntry) -> PartitionKey {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|f| Self::render(entry.get(f)))
            .collect();
        PartitionKey::new(parts.join(&self.separator))
    }

    fn describe(&self) -> String {
        format!("fields({})", self.fields.join(","))
    }
}

/// Key computed by a caller-supplied closure
pub struct FnKeying<F>(F);

impl<F> FnKeying<F>
where
    F: Fn(&DesiredEntry) -> String + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> KeyingStrategy for FnKeying<F>
where
    F: Fn(&DesiredEntry) -> String + Send + Sync,
{
    fn key(&self, entry: &DesiredEntry) -> PartitionKey {
        PartitionKey::new((self.0)(entry))
    }
}

/// Compute the partition key, falling back to `"default"` without a strategy
pub fn compute_key(entry: &DesiredEntry, keying: Option<&dyn KeyingStrategy>) -> PartitionKey {
    match keying {
        Some(strategy) => strategy.key(entry),
        None => PartitionKey::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> DesiredEntry {
        DesiredEntry::from_value(value, 0).unwrap()
    }

    #[test]
    fn test_no_strategy_yields_default() {
        assert_eq!(compute_key(&entry(json!({"a": 1})), None).as_str(), "default");
    }

    #[test]
    fn test_field_keying_joins_values() {
        let keying = FieldKeying::new(["region", "sku"]).unwrap();
        let key = keying.key(&entry(json!({"region": "eu", "sku": 42})));
        assert_eq!(key.as_str(), "eu:42");
    }

    #[test]
    fn test_field_keying_absent_field_is_empty() {
        let keying = FieldKeying::new(["region", "sku"]).unwrap().with_separator("/");
        let key = keying.key(&entry(json!({"sku": "a"})));
        assert_eq!(key.as_str(), "/a");
    }

    #[test]
    fn test_field_keying_requires_fields() {
        let err = FieldKeying::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ScdxError::EmptyKeyingFields);
    }

    #[test]
    fn test_fn_keying() {
        let keying = FnKeying::new(|e: &DesiredEntry| {
            e.get("kind").and_then(Value::as_str).unwrap_or("none").to_uppercase()
        });
        let key = compute_key(&entry(json!({"kind": "book"})), Some(&keying as &dyn KeyingStrategy));
        assert_eq!(key.as_str(), "BOOK");
    }
}
