use crate::errors::{Result, ScdxError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of the desired snapshot
///
/// An arbitrary JSON object supplied by the caller each run. It is the
/// current truth for one logical item and becomes the payload of the record
/// inserted (or updated) on its behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DesiredEntry {
    fields: Map<String, Value>,
}

impl DesiredEntry {
    /// Create an entry from an object map
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Create an entry from an arbitrary JSON value
    ///
    /// `position` is only used for the error message.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotAnObject` if the value is not a JSON object.
    pub fn from_value(value: Value, position: usize) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ScdxError::EntryNotAnObject {
                position,
                found: json_type_name(&other).to_string(),
            }),
        }
    }

    /// Get a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Check if a field exists
    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Borrow the underlying object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the entry has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for DesiredEntry {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for DesiredEntry {
    type Error = ScdxError;

    fn try_from(value: Value) -> Result<Self> {
        DesiredEntry::from_value(value, 0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Hex-encoded content digest of an entry's hashed fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Grouping key derived from an entry by the keying strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Key used when no keying strategy is configured
    pub const DEFAULT: &'static str = "default";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PartitionKey {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned opaque record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-ordered identifier (UUIDv7)
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = DesiredEntry::from_value(json!([1, 2]), 3).unwrap_err();
        assert_eq!(
            err,
            ScdxError::EntryNotAnObject {
                position: 3,
                found: "array".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_transparent_object() {
        let entry: DesiredEntry = serde_json::from_value(json!({"id": 1, "v": "x"})).unwrap();
        assert_eq!(entry.get("v"), Some(&json!("x")));
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn test_default_partition_key() {
        assert_eq!(PartitionKey::default().as_str(), "default");
    }

    #[test]
    fn test_generated_record_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }
}
