//! Setting keys and the fall-back values applied when a key is unset.
//!
//! # Design
//! - Centralize key names so the store, the model and the tests agree.
//! - A key that is missing, `null` or the empty string takes its default.

use serde_json::{Value, json};

/// Emit extra diagnostics to the console sink.
pub const DEBUG: &str = "debug";
/// Replicate automatically after every save.
pub const REPLICATE_ON_SAVE: &str = "replicate_on_save";
/// Create the destination's parent directory before copying.
pub const MKDIR: &str = "mkdir";
/// Default replication method for mappings that do not name one.
pub const METHOD: &str = "method";
/// Default remote host.
pub const HOST: &str = "host";
/// Default remote port.
pub const PORT: &str = "port";
/// Default remote user.
pub const USER_NAME: &str = "user_name";
/// Default identity file handed to `ssh`/`scp`.
pub const IDENTITY_FILE: &str = "identity_file";
/// Preserve modification times and modes when copying.
pub const PRESERVE_METADATA: &str = "preserve_metadata";
/// Ordered list of mapping records.
pub const REPLICATE: &str = "replicate";

/// Every recognised key, in documentation order.
pub const KEYS: &[&str] = &[
    DEBUG,
    REPLICATE_ON_SAVE,
    MKDIR,
    METHOD,
    HOST,
    PORT,
    USER_NAME,
    IDENTITY_FILE,
    PRESERVE_METADATA,
    REPLICATE,
];

/// Method used when neither the mapping nor the settings name one.
pub const DEFAULT_METHOD: &str = "scp";
/// Port used when neither the mapping nor the settings name one.
pub const DEFAULT_PORT: u16 = 22;

/// Fall-back value for `key`, or `None` for unrecognised keys.
#[must_use]
pub fn default_value(key: &str) -> Option<Value> {
    let value = match key {
        DEBUG | MKDIR | PRESERVE_METADATA => json!(false),
        REPLICATE_ON_SAVE => json!(true),
        METHOD => json!(DEFAULT_METHOD),
        HOST | IDENTITY_FILE => Value::Null,
        PORT => json!(DEFAULT_PORT),
        USER_NAME => json!(current_user_name()),
        REPLICATE => json!([]),
        _ => return None,
    };
    Some(value)
}

/// Whether a stored value should be replaced by its default.
#[must_use]
pub fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Name of the user running the process.
#[cfg(unix)]
#[must_use]
pub fn current_user_name() -> String {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::current()) {
        Ok(Some(user)) => user.name,
        Ok(None) | Err(_) => user_name_from_env(),
    }
}

/// Name of the user running the process.
#[cfg(not(unix))]
#[must_use]
pub fn current_user_name() -> String {
    user_name_from_env()
}

fn user_name_from_env() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
        .unwrap_or_default()
}
