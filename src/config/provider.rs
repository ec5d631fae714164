//! Configuration Provider Trait

use serde::de::DeserializeOwned;

use super::{ConfigError, ConfigResult};

/// Core configuration provider trait
pub trait ConfigProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Get a raw configuration value
    fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;

    /// List keys matching a prefix
    fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>>;
}

/// Extension methods for typed configuration access
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a typed configuration value.
    ///
    /// Raw values are parsed as JSON; a value that is not valid JSON is tried
    /// as a plain string, so `SERVICES=s3` reads as `"s3"`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<Option<T>> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(json_err) => serde_json::from_value(serde_json::Value::String(raw))
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: json_err.to_string(),
                }),
        }
    }

    /// Get a typed value, falling back to `default` when the key is absent
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Get a typed value that must be present
    fn require<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<T> {
        self.get(key)?.ok_or_else(|| ConfigError::NotFound {
            key: key.to_string(),
        })
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}
