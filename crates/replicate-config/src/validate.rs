//! Validation helpers for individual setting values.

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Interpret a setting as a boolean.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything other than `true`/`false`.
pub fn parse_bool(value: &Value, field: &str) -> ConfigResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::invalid(field, Some(value.to_string()), "must be a boolean"))
}

/// Interpret a setting as a TCP port.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an integer in `1..=65535`.
pub fn parse_port(value: &Value, field: &str) -> ConfigResult<u16> {
    let port = value
        .as_i64()
        .ok_or_else(|| ConfigError::invalid(field, Some(value.to_string()), "must be an integer"))?;

    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            ConfigError::invalid(
                field,
                Some(port.to_string()),
                "must be between 1 and 65535",
            )
        })
}

/// Interpret a setting as a string.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a string.
pub fn parse_string(value: &Value, field: &str) -> ConfigResult<String> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ConfigError::invalid(field, Some(value.to_string()), "must be a string"))
}

/// Interpret a setting as an optional string; `null` and `""` map to `None`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is neither a string nor `null`.
pub fn parse_optional_string(value: &Value, field: &str) -> ConfigResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        other => Err(ConfigError::invalid(
            field,
            Some(other.to_string()),
            "must be a string or null",
        )),
    }
}

/// Interpret a setting as a list of records.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an array.
pub fn parse_list<'a>(value: &'a Value, field: &str) -> ConfigResult<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ConfigError::invalid(field, Some(value.to_string()), "must be a list"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_port_accepts_valid_range() {
        assert_eq!(parse_port(&json!(2222), "port").ok(), Some(2222));
        assert_eq!(parse_port(&json!(65_535), "port").ok(), Some(65_535));
    }

    #[test]
    fn parse_port_rejects_out_of_range_and_non_numeric() {
        let Err(err) = parse_port(&json!(0), "port") else {
            panic!("port 0 should be rejected");
        };
        assert!(err.summary().contains("between 1 and 65535"));

        let Err(err) = parse_port(&json!(70_000), "port") else {
            panic!("port 70000 should be rejected");
        };
        assert!(err.summary().contains("between 1 and 65535"));

        let Err(err) = parse_port(&json!("22"), "port") else {
            panic!("string port should be rejected");
        };
        assert!(err.summary().contains("must be an integer"));
    }

    #[test]
    fn parse_optional_string_treats_empty_as_absent() {
        assert_eq!(parse_optional_string(&json!(""), "host").ok(), Some(None));
        assert_eq!(parse_optional_string(&Value::Null, "host").ok(), Some(None));
        assert_eq!(
            parse_optional_string(&json!("example.org"), "host").ok(),
            Some(Some("example.org".to_string()))
        );
        assert!(parse_optional_string(&json!(1), "host").is_err());
    }

    #[test]
    fn parse_bool_and_list_reject_wrong_shapes() {
        assert_eq!(parse_bool(&json!(true), "debug").ok(), Some(true));
        assert!(parse_bool(&json!("yes"), "debug").is_err());
        assert!(parse_list(&json!({}), "replicate").is_err());
        assert_eq!(parse_list(&json!([1, 2]), "replicate").map(<[Value]>::len).ok(), Some(2));
    }
}
