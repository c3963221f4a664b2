//! Key/value settings store supplied by the host environment.
//!
//! # Design
//! - The engine only reads through [`SettingsStore`]; hosts own persistence.
//! - [`MemorySettings`] backs the CLI and the test suites with a JSON document.

use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Named configuration values with host-managed persistence.
pub trait SettingsStore: Send + Sync {
    /// Current value for `key`, if one is stored.
    fn get(&self, key: &str) -> Option<Value>;
    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: Value);
}

/// Fill every recognised key that is missing, `null` or empty with its default.
pub fn apply_defaults(store: &dyn SettingsStore) {
    for key in defaults::KEYS {
        if defaults::is_unset(store.get(key).as_ref()) {
            if let Some(value) = defaults::default_value(key) {
                debug!(key = *key, "applying settings default");
                store.set(key, value);
            }
        }
    }
}

/// In-memory settings store, optionally seeded from a JSON object.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<Map<String, Value>>,
}

impl MemorySettings {
    /// Empty store; every key resolves to its default once loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from an existing JSON object.
    #[must_use]
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Parse a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns an error when the text is not JSON or not a JSON object.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        Self::parse(text, None)
    }

    /// Read and parse a JSON settings document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not JSON, or is not a
    /// JSON object.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse(&text, Some(path))?;
        debug!(path = %path.display(), "loaded settings document");
        Ok(store)
    }

    fn parse(text: &str, path: Option<&Path>) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.map(Path::to_path_buf),
            source,
        })?;
        match value {
            Value::Object(values) => Ok(Self::from_map(values)),
            _ => Err(ConfigError::NotAnObject {
                path: path.map(Path::to_path_buf),
            }),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }
}
