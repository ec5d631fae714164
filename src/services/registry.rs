//! Service lookup on top of a [`PluginManager`].

use std::sync::Arc;

use crate::plugins::{
    LoadValue, PluginFinder, PluginLifecycleListener, PluginManager, PluginState,
};
use crate::{Error, Result};

/// Default namespace for service plugins.
pub const SERVICES_NAMESPACE: &str = "services";

/// Resolves services by name, loading the backing plugin on first use.
#[derive(Debug)]
pub struct ServiceRegistry {
    manager: PluginManager,
}

impl ServiceRegistry {
    /// Discovers the service plugins of `namespace`.
    pub fn new(namespace: impl Into<String>, finder: &dyn PluginFinder) -> Result<Self> {
        Ok(Self::from_manager(PluginManager::new(namespace, finder)?))
    }

    /// Discovers the service plugins of `namespace`, reporting lifecycle events
    /// to `listener`.
    pub fn with_listener(
        namespace: impl Into<String>,
        finder: &dyn PluginFinder,
        listener: Arc<dyn PluginLifecycleListener>,
    ) -> Result<Self> {
        let manager = PluginManager::builder(namespace)
            .listener_arc(listener)
            .build(finder)?;
        Ok(Self::from_manager(manager))
    }

    pub fn from_manager(manager: PluginManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    pub fn list_services(&self) -> Vec<&str> {
        self.manager.list_names()
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.manager.exists(name)
    }

    /// Loads the service if needed and returns its value.
    ///
    /// Unknown services fail with [`Error::PluginNotFound`]; services that are
    /// disabled or failed to start fail with [`Error::NotLoaded`].
    pub fn get_service(&self, name: &str) -> Result<LoadValue> {
        let holder = self.manager.load(name)?;
        match holder.load_value() {
            Some(value) => Ok(value.clone()),
            None => Err(Error::NotLoaded {
                namespace: self.manager.namespace().to_string(),
                name: name.to_string(),
                state: holder.state(),
            }),
        }
    }

    /// Starts every enabled service, returning the names that are running.
    pub fn start_all(&self) -> Vec<String> {
        self.manager.map_load(|holder| holder.name().to_string())
    }

    pub fn state(&self, name: &str) -> Result<PluginState> {
        self.manager.state(name)
    }
}
