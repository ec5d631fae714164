//! Plugin wrapper for a named service provider.

use std::fmt;
use std::sync::Arc;

use crate::config::ServicesConfig;
use crate::plugins::{BoxError, LoadArgs, LoadValue, Plugin, PluginSpec};

type ServiceConstructor = Arc<dyn Fn(&LoadArgs) -> Result<LoadValue, BoxError> + Send + Sync>;

/// A plugin that provides one service.
///
/// It only activates when its service is enabled by the shared
/// [`ServicesConfig`]; loading runs the service constructor.
#[derive(Clone)]
pub struct ServicePlugin {
    service: String,
    provider: String,
    config: Arc<ServicesConfig>,
    constructor: ServiceConstructor,
}

impl ServicePlugin {
    pub fn new<F>(
        service: impl Into<String>,
        provider: impl Into<String>,
        config: Arc<ServicesConfig>,
        constructor: F,
    ) -> Self
    where
        F: Fn(&LoadArgs) -> Result<LoadValue, BoxError> + Send + Sync + 'static,
    {
        Self {
            service: service.into(),
            provider: provider.into(),
            config,
            constructor: Arc::new(constructor),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Describes this service as a plugin named after the service, with
    /// `service` and `provider` metadata. Each instantiation clones the
    /// prototype.
    pub fn into_spec(self, namespace: impl Into<String>) -> PluginSpec {
        let name = self.service.clone();
        let service = self.service.clone();
        let provider = self.provider.clone();
        PluginSpec::from_constructor(namespace, name, move || self.clone())
            .metadata("service", service)
            .metadata("provider", provider)
    }
}

impl Plugin for ServicePlugin {
    fn should_load(&self) -> bool {
        !self.service.is_empty() && self.config.is_enabled(&self.service)
    }

    fn load(&mut self, args: &LoadArgs) -> Result<LoadValue, BoxError> {
        tracing::debug!(service = %self.service, provider = %self.provider, "Starting service");
        (self.constructor)(args)
    }
}

impl fmt::Debug for ServicePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePlugin")
            .field("service", &self.service)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
