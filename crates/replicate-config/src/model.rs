//! Typed settings models.
//!
//! # Design
//! - Pure data carriers read by the replication engine.
//! - `RawMapping` keeps track of which fields a record spelled out so the
//!   merge with global defaults can tell "absent" from "explicitly null".

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::store::SettingsStore;
use crate::validate::{parse_bool, parse_list, parse_optional_string, parse_port, parse_string};

/// Replication strategy attached to a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    /// Copy through the local filesystem with `cp`.
    LocalCopy,
    /// Copy to a remote host with `ssh`/`scp`.
    RemoteCopy,
    /// Any other value; reported and skipped by the dispatcher.
    Unrecognised(String),
}

impl Method {
    /// Canonical settings spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LocalCopy => "cp",
            Self::RemoteCopy => "scp",
            Self::Unrecognised(value) => value,
        }
    }

    /// Label used for metrics; collapses unrecognised values.
    #[must_use]
    pub const fn metric_label(&self) -> &'static str {
        match self {
            Self::LocalCopy => "cp",
            Self::RemoteCopy => "scp",
            Self::Unrecognised(_) => "unrecognised",
        }
    }
}

impl From<String> for Method {
    fn from(value: String) -> Self {
        match value.as_str() {
            "cp" | "local-copy" => Self::LocalCopy,
            "scp" | "remote-copy" => Self::RemoteCopy,
            _ => Self::Unrecognised(value),
        }
    }
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl Display for Method {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Mapping record exactly as it appears in the `replicate` list.
///
/// Nullable fields use `Option<Option<T>>`: the outer `None` means the record
/// did not mention the field, `Some(None)` means it was set to `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawMapping {
    /// Local path prefix.
    #[serde(default)]
    pub local: Option<String>,
    /// Replacement for the local prefix on the destination side.
    #[serde(default)]
    pub remote: Option<String>,
    /// Replication method override.
    #[serde(default)]
    pub method: Option<Method>,
    /// Remote host override.
    #[serde(default, deserialize_with = "explicit")]
    pub host: Option<Option<String>>,
    /// Remote port override.
    #[serde(default, deserialize_with = "record_port")]
    pub port: Option<u16>,
    /// Remote user override.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Identity file override.
    #[serde(default, deserialize_with = "explicit")]
    pub identity_file: Option<Option<String>>,
    /// Metadata preservation override.
    #[serde(default)]
    pub preserve_metadata: Option<bool>,
}

impl RawMapping {
    /// Decode the record at 1-based position `index` of the `replicate` list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMapping`] when the record is not an object
    /// or one of its fields has the wrong shape.
    pub fn decode(index: usize, record: &Value) -> ConfigResult<Self> {
        Self::deserialize(record).map_err(|source| ConfigError::InvalidMapping { index, source })
    }
}

fn record_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_port(&value, defaults::PORT)
            .map(Some)
            .map_err(|err| serde::de::Error::custom(err.summary())),
    }
}

fn explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fully specified mapping: a raw record merged over the global defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    /// 1-based position of the record in the `replicate` list.
    pub index: usize,
    /// Local path prefix.
    pub local: String,
    /// Replacement for the local prefix on the destination side.
    pub remote: String,
    /// Replication method.
    pub method: Method,
    /// Remote host, if any.
    pub host: Option<String>,
    /// Remote port.
    pub port: u16,
    /// Remote user.
    pub user_name: String,
    /// Identity file passed to `ssh`/`scp`.
    pub identity_file: Option<String>,
    /// Preserve modification times and modes.
    pub preserve_metadata: bool,
}

/// Snapshot of every setting the engine reads during a replication cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Emit extra diagnostics to the console sink.
    pub debug: bool,
    /// Replicate automatically after every save.
    pub replicate_on_save: bool,
    /// Create the destination's parent directory before copying.
    pub mkdir: bool,
    /// Default replication method.
    pub method: Method,
    /// Default remote host.
    pub host: Option<String>,
    /// Default remote port.
    pub port: u16,
    /// Default remote user.
    pub user_name: String,
    /// Default identity file.
    pub identity_file: Option<String>,
    /// Default metadata preservation flag.
    pub preserve_metadata: bool,
    /// Mapping records in configuration order, undecoded so one malformed
    /// record cannot hide the others.
    pub replicate: Vec<Value>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug: false,
            replicate_on_save: true,
            mkdir: false,
            method: Method::from(defaults::DEFAULT_METHOD),
            host: None,
            port: defaults::DEFAULT_PORT,
            user_name: defaults::current_user_name(),
            identity_file: None,
            preserve_metadata: false,
            replicate: Vec::new(),
        }
    }
}

impl GlobalConfig {
    /// Read a snapshot from the store, substituting defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns an error when a stored value has the wrong shape. Mapping
    /// records are decoded later, one at a time, with [`RawMapping::decode`].
    pub fn from_store(store: &dyn SettingsStore) -> ConfigResult<Self> {
        let lookup = |key: &str| -> Value {
            let stored = store.get(key);
            if defaults::is_unset(stored.as_ref()) {
                defaults::default_value(key).unwrap_or(Value::Null)
            } else {
                stored.unwrap_or(Value::Null)
            }
        };

        let replicate = parse_list(&lookup(defaults::REPLICATE), defaults::REPLICATE)?.to_vec();

        Ok(Self {
            debug: parse_bool(&lookup(defaults::DEBUG), defaults::DEBUG)?,
            replicate_on_save: parse_bool(
                &lookup(defaults::REPLICATE_ON_SAVE),
                defaults::REPLICATE_ON_SAVE,
            )?,
            mkdir: parse_bool(&lookup(defaults::MKDIR), defaults::MKDIR)?,
            method: Method::from(parse_string(&lookup(defaults::METHOD), defaults::METHOD)?),
            host: parse_optional_string(&lookup(defaults::HOST), defaults::HOST)?,
            port: parse_port(&lookup(defaults::PORT), defaults::PORT)?,
            user_name: parse_string(&lookup(defaults::USER_NAME), defaults::USER_NAME)?,
            identity_file: parse_optional_string(
                &lookup(defaults::IDENTITY_FILE),
                defaults::IDENTITY_FILE,
            )?,
            preserve_metadata: parse_bool(
                &lookup(defaults::PRESERVE_METADATA),
                defaults::PRESERVE_METADATA,
            )?,
            replicate,
        })
    }
}
