//! Composite Configuration Provider
//!
//! Chains multiple providers; the first provider holding a key wins.

use std::sync::Arc;

use super::ConfigResult;
use super::provider::ConfigProvider;

/// Provider that consults a list of providers in priority order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider with lower priority than those already added
    pub fn provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn provider_arc(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.get_raw(key)? {
                tracing::trace!(key, provider = provider.name(), "Config value resolved");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys = Vec::new();
        for provider in &self.providers {
            for key in provider.list_keys(prefix)? {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}
