//! Container settings.
//!
//! Settings are plain data: built in code, deserialized from JSON, or read
//! from environment variables on top of the defaults.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs shared by a container tree.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::ContainerSettings;
///
/// let settings = ContainerSettings::from_json(r#"{ "max_depth": 64 }"#).unwrap();
/// assert_eq!(settings.max_depth, 64);
/// assert!(settings.proxy_circular_interfaces);
/// assert!(!settings.trace_resolution);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Longest dependency path before resolution gives up
    pub max_depth: usize,
    /// Break circular dependencies that go through an interface with a
    /// proxy instead of failing
    pub proxy_circular_interfaces: bool,
    /// Install a [`TracingObserver`](crate::TracingObserver) on every
    /// container
    pub trace_resolution: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        ContainerSettings {
            max_depth: 1024,
            proxy_circular_interfaces: true,
            trace_resolution: false,
        }
    }
}

impl ContainerSettings {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `<PREFIX>_MAX_DEPTH`,
    /// `<PREFIX>_PROXY_CIRCULAR_INTERFACES` and `<PREFIX>_TRACE_RESOLUTION`.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        Self::from_source(|key| env::var(format!("{}_{}", prefix, key.to_uppercase())).ok())
    }

    /// Defaults overridden by the values `lookup` finds for the field names.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(value) = lookup("max_depth") {
            settings.max_depth = parse("max_depth", &value)?;
        }
        if let Some(value) = lookup("proxy_circular_interfaces") {
            settings.proxy_circular_interfaces = parse_flag("proxy_circular_interfaces", &value)?;
        }
        if let Some(value) = lookup("trace_resolution") {
            settings.trace_resolution = parse_flag("trace_resolution", &value)?;
        }
        Ok(settings)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
