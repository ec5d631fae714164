//! Enabled-services list used for configuration-driven activation.

use std::collections::BTreeSet;

use serde_json::Value;

use super::provider::ConfigProvider;
use super::{ConfigResult, EnvConfigProvider};

/// Configuration key holding the enabled-services list.
pub const SERVICES_KEY: &str = "services";

/// Which services may be activated.
///
/// The list is read from the `services` key, either as a comma-separated
/// string (`s3,sqs`) or a JSON array (`["s3", "sqs"]`). When the key is
/// absent every service is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicesConfig {
    enabled: Option<BTreeSet<String>>,
}

impl ServicesConfig {
    /// Every service enabled.
    pub fn all() -> Self {
        Self { enabled: None }
    }

    /// Only the given services enabled.
    pub fn only<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: Some(services.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_provider(provider: &dyn ConfigProvider) -> ConfigResult<Self> {
        let Some(raw) = provider.get_raw(SERVICES_KEY)? else {
            return Ok(Self::all());
        };
        Ok(Self::parse(&raw))
    }

    /// Reads the `SERVICES` environment variable.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_provider(&EnvConfigProvider::new())
    }

    /// Parses a raw list value. Names are trimmed; empty entries are dropped.
    ///
    /// JSON values are unwrapped first: an array lists names, a string is a
    /// comma-separated list and `null` enables every service. Anything else
    /// is read as a plain comma-separated list.
    pub fn parse(raw: &str) -> Self {
        let names: Vec<String> = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Null) => return Self::all(),
            Ok(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => name,
                    other => other.to_string(),
                })
                .collect(),
            Ok(Value::String(list)) => split_list(&list),
            _ => split_list(raw),
        };
        Self::only(
            names
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn is_enabled(&self, service: &str) -> bool {
        match &self.enabled {
            Some(enabled) => enabled.contains(service),
            None => true,
        }
    }

    /// The explicit list, or `None` when every service is enabled.
    pub fn enabled(&self) -> Option<&BTreeSet<String>> {
        self.enabled.as_ref()
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(str::to_string).collect()
}
