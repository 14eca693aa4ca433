//! Run configuration
//!
//! A run is described by a TOML file whose sections mirror the pipeline:
//!
//! ```toml
//! [store]
//! path = ".scdx/store.db"
//! busy_timeout_ms = 5000
//!
//! [scope]
//! collection = "products"
//! keys = ["eu"]
//! [scope.payload]
//! tenant = "acme"
//!
//! [hashing]
//! pick = ["v"]
//!
//! [keying]
//! fields = ["region"]
//! separator = ":"
//!
//! [run]
//! dry_run = false
//! timeout_ms = 30000
//! ```
//!
//! Every section is optional in the file; [`RunOverrides`] layers command
//! line values on top, and [`RunConfig::validate`] checks the merged result.

#![allow(clippy::result_large_err)]

use scdx_core::errors::{ExError, ExErrorKind, ScdxError};
use scdx_core::{FieldKeying, HashingConfig, ReconcileConfig, ScopeFilter};
use scdx_core_types::Sensitive;
use scdx_store::StoreOptions;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// `[store]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Store connection (SQLite path); redacted in logs
    #[serde(default)]
    pub path: Option<Sensitive<String>>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[scope]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub payload: BTreeMap<String, Value>,
}

/// `[keying]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyingSection {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub separator: Option<String>,
}

/// `[run]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Complete configuration of a reconciliation run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub scope: ScopeSection,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub keying: KeyingSection,
    #[serde(default)]
    pub run: RunSection,
}

/// Command line values layered over the file configuration
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub db: Option<PathBuf>,
    pub collection: Option<String>,
    pub pick: Option<Vec<String>>,
    pub omit: Option<Vec<String>>,
    pub key_fields: Option<Vec<String>>,
    pub dry_run: bool,
    pub timeout_ms: Option<u64>,
}

fn config_error(op: &str, reason: impl Into<String>) -> ExError {
    ExError::from(ScdxError::InvalidConfiguration {
        reason: reason.into(),
    })
    .with_op(op)
}

impl RunConfig {
    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// `Configuration` when the TOML is malformed or has unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ExError> {
        toml::from_str(text).map_err(|e| config_error("parse_config", e.to_string()))
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Configuration` when it cannot be
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, ExError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Layer command line values over the file values
    pub fn apply_overrides(&mut self, overrides: RunOverrides) {
        if let Some(db) = overrides.db {
            self.store.path = Some(Sensitive::new(db.to_string_lossy().into_owned()));
        }
        if let Some(collection) = overrides.collection {
            self.scope.collection = collection;
        }
        // Either flag replaces the whole [hashing] section
        if overrides.pick.is_some() || overrides.omit.is_some() {
            self.hashing = HashingConfig {
                pick: overrides.pick,
                omit: overrides.omit,
            };
        }
        if let Some(fields) = overrides.key_fields {
            self.keying.fields = fields;
        }
        if overrides.dry_run {
            self.run.dry_run = true;
        }
        if overrides.timeout_ms.is_some() {
            self.run.timeout_ms = overrides.timeout_ms;
        }
    }

    /// Check that a run can be started with this configuration
    ///
    /// # Errors
    ///
    /// `Configuration` when the store connection or the collection is
    /// missing, or the scope filter is invalid.
    pub fn validate(&self) -> Result<(), ExError> {
        if self.store_path().is_none() {
            return Err(ExError::from(ScdxError::MissingStoreConnection).with_op("validate_config"));
        }
        self.scope()
            .validate()
            .map_err(|e| ExError::from(e).with_op("validate_config"))?;
        if self.hashing.pick.is_some() && self.hashing.omit.is_some() {
            tracing::warn!("Both pick and omit are configured; omit is ignored");
        }
        Ok(())
    }

    /// Store path, if configured and non-blank
    pub fn store_path(&self) -> Option<&str> {
        self.store
            .path
            .as_ref()
            .map(|p| p.expose().as_str())
            .filter(|p| !p.trim().is_empty())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
        }
    }

    /// Scope filter of the run
    pub fn scope(&self) -> ScopeFilter {
        ScopeFilter {
            collection: self.scope.collection.clone(),
            keys: self
                .scope
                .keys
                .as_ref()
                .map(|keys| keys.iter().map(scdx_core::PartitionKey::new).collect()),
            payload: self.scope.payload.clone(),
        }
    }

    /// Hashing and keying configuration of the run
    ///
    /// # Errors
    ///
    /// `Configuration` when `[keying]` sets a separator without fields.
    pub fn reconcile_config(&self) -> Result<ReconcileConfig, ExError> {
        let config = ReconcileConfig::new(self.hashing.clone());
        if self.keying.fields.is_empty() {
            if self.keying.separator.is_some() {
                return Err(ExError::from(ScdxError::EmptyKeyingFields).with_op("reconcile_config"));
            }
            return Ok(config);
        }

        let mut keying = FieldKeying::new(self.keying.fields.iter().cloned())
            .map_err(|e| ExError::from(e).with_op("reconcile_config"))?;
        if let Some(separator) = &self.keying.separator {
            keying = keying.with_separator(separator.clone());
        }
        Ok(config.with_keying(keying))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.run.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scdx_core::KeyingStrategy;
    use serde_json::json;

    const FULL: &str = r#"
[store]
path = "/tmp/store.db"
busy_timeout_ms = 250

[scope]
collection = "products"
keys = ["eu"]
[scope.payload]
tenant = "acme"
tier = 2

[hashing]
pick = ["v"]

[keying]
fields = ["region", "sku"]
separator = "/"

[run]
dry_run = true
timeout_ms = 30000
"#;

    #[test]
    fn test_parse_full_document() {
        let config = RunConfig::from_toml_str(FULL).unwrap();

        assert_eq!(config.store_path(), Some("/tmp/store.db"));
        assert_eq!(config.store_options().busy_timeout, Duration::from_millis(250));
        let scope = config.scope();
        assert_eq!(scope.collection, "products");
        assert_eq!(scope.payload.get("tenant"), Some(&json!("acme")));
        assert_eq!(scope.payload.get("tier"), Some(&json!(2)));
        assert_eq!(config.hashing, HashingConfig::pick(["v"]));
        assert!(config.run.dry_run);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_path_redacted_in_debug() {
        let config = RunConfig::from_toml_str(FULL).unwrap();
        let text = format!("{:?}", config);
        assert!(!text.contains("/tmp/store.db"));
        assert!(text.contains("REDACTED"));
    }

    #[test]
    fn test_unknown_key_is_configuration_error() {
        let err = RunConfig::from_toml_str("[scope]\ncolection = \"x\"").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }

    #[test]
    fn test_misspelled_hashing_key_is_rejected() {
        let err = RunConfig::from_toml_str("[hashing]\npik = [\"v\"]").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
        assert!(err.message().contains("pik"), "{}", err.message());
    }

    #[test]
    fn test_missing_store_is_configuration_error() {
        let config = RunConfig::from_toml_str("[scope]\ncollection = \"products\"").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
        assert!(err.message().contains("store connection"));
    }

    #[test]
    fn test_missing_collection_is_configuration_error() {
        let config = RunConfig::from_toml_str("[store]\npath = \"s.db\"").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = RunConfig::from_toml_str(FULL).unwrap();
        config.apply_overrides(RunOverrides {
            db: Some(PathBuf::from("other.db")),
            collection: Some("orders".to_string()),
            omit: Some(vec!["note".to_string()]),
            ..RunOverrides::default()
        });

        assert_eq!(config.store_path(), Some("other.db"));
        assert_eq!(config.scope.collection, "orders");
        assert_eq!(config.hashing, HashingConfig::omit(["note"]));
        // Untouched values survive
        assert!(config.run.dry_run);
    }

    #[test]
    fn test_reconcile_config_uses_keying_section() {
        let config = RunConfig::from_toml_str(FULL).unwrap();
        let reconcile = config.reconcile_config().unwrap();
        let keying = reconcile.keying.unwrap();
        let entry =
            scdx_core::DesiredEntry::from_value(json!({"region": "eu", "sku": "a"}), 0).unwrap();
        assert_eq!(keying.key(&entry).as_str(), "eu/a");
    }

    #[test]
    fn test_separator_without_fields_is_rejected() {
        let config = RunConfig::from_toml_str("[keying]\nseparator = \"/\"").unwrap();
        let err = config.reconcile_config().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }
}
