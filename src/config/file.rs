//! File-based Configuration Provider
//!
//! Reads configuration from a JSON file. Nested objects are addressed with
//! dot-separated keys, so `{"plugins": {"strict": true}}` exposes `plugins.strict`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

/// JSON file configuration provider.
///
/// The file is read on first access and cached. A missing file is treated as
/// empty configuration.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    cache: RwLock<Option<HashMap<String, Value>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops the cached contents; the next access re-reads the file.
    pub fn reload(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load(&self) -> ConfigResult<HashMap<String, Value>> {
        if let Some(data) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(data.clone());
        }

        let data = match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let root: Value = serde_json::from_str(&content)?;
                let mut flat = HashMap::new();
                flatten("", root, &mut flat);
                flat
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Config file not found, using empty config");
                HashMap::new()
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
        Ok(data)
    }
}

fn flatten(prefix: &str, value: Value, out: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten(&key, v, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other);
        }
    }
}

impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        let data = self.load()?;
        Ok(data.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let data = self.load()?;
        Ok(data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProviderExt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_provider_nested_keys() {
        let file = write_config(
            r#"{"services": ["s3", "sqs"], "plugins": {"strict": true, "name": "svc"}}"#,
        );
        let provider = FileConfigProvider::new(file.path());

        assert_eq!(
            provider.get_raw("plugins.name").unwrap(),
            Some("svc".to_string())
        );
        assert_eq!(provider.get::<bool>("plugins.strict").unwrap(), Some(true));
        assert_eq!(
            provider.get::<Vec<String>>("services").unwrap(),
            Some(vec!["s3".to_string(), "sqs".to_string()])
        );

        let mut keys = provider.list_keys("plugins.").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["plugins.name", "plugins.strict"]);
    }

    #[test]
    fn test_file_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("absent.json"));
        assert_eq!(provider.get_raw("services").unwrap(), None);
        assert!(provider.list_keys("").unwrap().is_empty());
    }

    #[test]
    fn test_file_provider_invalid_json() {
        let file = write_config("{ not json");
        let provider = FileConfigProvider::new(file.path());
        assert!(matches!(
            provider.get_raw("services"),
            Err(ConfigError::Serialization(_))
        ));
    }

    #[test]
    fn test_file_provider_reload() {
        let file = write_config(r#"{"services": "s3"}"#);
        let provider = FileConfigProvider::new(file.path());
        assert_eq!(provider.get_raw("services").unwrap(), Some("s3".into()));

        std::fs::write(file.path(), r#"{"services": "sqs"}"#).unwrap();
        assert_eq!(provider.get_raw("services").unwrap(), Some("s3".into()));

        provider.reload();
        assert_eq!(provider.get_raw("services").unwrap(), Some("sqs".into()));
    }
}
