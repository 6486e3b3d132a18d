//! API credentials for the model, search and catalog services.
//!
//! Values are held in a [`SecretString`] and only leave it through
//! [`ApiCredential::expose`], at the point where a request header or body
//! is built.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

/// A credential could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("{name} required: set '{config_key}' in config or the {env_var} environment variable")]
    Missing {
        name: &'static str,
        config_key: String,
        env_var: String,
    },

    #[error("{name} is empty")]
    Empty { name: &'static str },
}

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        })
    }
}

/// A secret value plus where it came from.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Read from an environment variable. Blank values count as missing.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, CredentialError> {
        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(Self::new(value, CredentialSource::Environment, name))
            }
            _ => Err(CredentialError::Missing {
                name,
                config_key: String::new(),
                env_var: env_var.to_string(),
            }),
        }
    }

    /// Read `config_key` from a JSON provider config, falling back to `env_var`.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, CredentialError> {
        if let Some(value) = config.get(config_key).and_then(JsonValue::as_str) {
            if value.trim().is_empty() {
                return Err(CredentialError::Empty { name });
            }
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        Self::from_env(env_var, name).map_err(|_| CredentialError::Missing {
            name,
            config_key: config_key.to_string(),
            env_var: env_var.to_string(),
        })
    }

    /// Whether [`from_config_or_env`](Self::from_config_or_env) would succeed.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config.get(config_key).and_then(JsonValue::as_str).is_some()
            || std::env::var(env_var).map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    /// The raw secret. Call only where the request is assembled.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug_or_display() {
        let secret = "sk-live-very-secret";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "OpenAI API key");
        let debug = format!("{cred:?}");
        let display = cred.to_string();
        assert!(!debug.contains(secret));
        assert!(!display.contains(secret));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_config_wins_over_env() {
        let config = serde_json::json!({"api_key": "from-config"});
        let cred =
            ApiCredential::from_config_or_env(&config, "api_key", "CADENCE_TEST_UNSET_KEY", "key")
                .unwrap();
        assert_eq!(cred.source(), CredentialSource::Config);
        assert_eq!(cred.expose(), "from-config");
    }

    #[test]
    fn test_missing_everywhere() {
        let config = serde_json::json!({});
        let err = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            "CADENCE_TEST_DEFINITELY_UNSET",
            "Tavily API key",
        )
        .unwrap_err();
        assert!(err.to_string().contains("CADENCE_TEST_DEFINITELY_UNSET"));
        assert!(!ApiCredential::is_available(&config, "api_key", "CADENCE_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_blank_config_value_rejected() {
        let config = serde_json::json!({"api_key": "  "});
        let err = ApiCredential::from_config_or_env(&config, "api_key", "X_UNSET", "key");
        assert_eq!(err.unwrap_err(), CredentialError::Empty { name: "key" });
    }
}
