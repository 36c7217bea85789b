//! # Client configuration
//!
//! A [`ClientConfig`] describes one SOAP endpoint and the defaults applied to
//! every call made to it. It can be:
//! - Loaded from a YAML file
//! - Built from environment variables only
//! - Overridden by environment variables (`PMOSOAP_CONFIG__<KEY>`)
//!
//! ## Usage
//!
//! ```no_run
//! use pmosoap::{ClientConfig, SoapClient};
//!
//! let config = ClientConfig::load("soap.yaml")?;
//! let client = SoapClient::from_config(&config)?;
//! # Ok::<(), pmosoap::SoapError>(())
//! ```
//!
//! ```yaml
//! base_address: "http://localhost:8080/services"
//! username: "admin"
//! password: "secret"
//! user_agent: "my-app/1.0"
//! action: "urn:example#Default"
//! debug: false
//! timeout_secs: 30
//! ```

use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::error::{Result, SoapError};

/// Prefix of the environment variables overriding the configuration
pub const ENV_PREFIX: &str = "PMOSOAP_CONFIG__";

// Keys whose environment value is read as YAML; the others stay strings
// (a "1234" password is not a number)
const TYPED_KEYS: &[&str] = &["debug", "timeout_secs"];

/// Configuration of a [`SoapClient`](crate::SoapClient)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address, the envelope path is appended to it
    pub base_address: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Default `SOAPAction` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Log request and response documents
    pub debug: bool,

    /// Timeout of a whole exchange, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Parses a YAML document, without environment overrides
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value, std::iter::empty())
    }

    /// Builds the configuration from `PMOSOAP_CONFIG__*` variables only
    pub fn from_env() -> Result<Self> {
        Self::from_value(Value::Mapping(Mapping::new()), env::vars())
    }

    /// Loads a YAML file and applies environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        info!(config_file = %path.display(), "Loaded SOAP client config file");

        let value: Value = serde_yaml::from_str(&data)?;
        Self::from_value(value, env::vars())
    }

    /// Builds the configuration from a YAML value and `(name, value)` pairs
    ///
    /// Only pairs whose name starts with [`ENV_PREFIX`] are used; keys are
    /// case-insensitive.
    pub fn from_value(
        value: Value,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut value = match lower_keys(value) {
            Value::Null => Value::Mapping(Mapping::new()),
            value @ Value::Mapping(_) => value,
            _ => return Err(SoapError::config("configuration root must be a mapping")),
        };

        for (name, raw) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = key.to_lowercase();
            let converted = if TYPED_KEYS.contains(&key.as_str()) {
                serde_yaml::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
            } else {
                Value::String(raw)
            };

            info!(key = %key, "Configuration overridden from environment");
            if let Value::Mapping(map) = &mut value {
                map.insert(Value::String(key), converted);
            }
        }

        let config: ClientConfig = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that cannot be defaulted
    pub fn validate(&self) -> Result<()> {
        if self.base_address.is_empty() {
            return Err(SoapError::config("base_address is required"));
        }
        if self.timeout_secs == Some(0) {
            return Err(SoapError::config("timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| match k {
                    Value::String(s) => (Value::String(s.to_lowercase()), lower_keys(v)),
                    k => (k, lower_keys(v)),
                })
                .collect(),
        ),
        _ => value,
    }
}
