//! # plugin-lifecycle
//!
//! Discovery and lifecycle management for named plugins.
//!
//! Plugins live in namespaces. A [`PluginManager`] discovers the plugins of one
//! namespace through a [`PluginFinder`], resolves each discovered source into a
//! [`PluginSpec`], and then instantiates and loads every plugin lazily, at most
//! once, even when many threads ask for it at the same time. Lifecycle
//! listeners observe every transition.
//!
//! ## Quick Start
//!
//! ```rust
//! use plugin_lifecycle::prelude::*;
//!
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn load(&mut self, args: &LoadArgs) -> std::result::Result<LoadValue, BoxError> {
//!         let who = args.get("who").and_then(|v| v.as_str()).unwrap_or("world");
//!         Ok(LoadValue::new(format!("hello {}", who)))
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let finder = StaticFinder::new()
//!         .spec(PluginSpec::from_constructor("demo.greeters", "greeter", || Greeter));
//!
//!     let manager = PluginManager::builder("demo.greeters")
//!         .load_args(LoadArgs::new().kwarg("who", "plugins"))
//!         .build(&finder)?;
//!
//!     let holder = manager.load("greeter")?;
//!     let greeting = holder.load_value().and_then(|v| v.downcast_ref::<String>());
//!     assert_eq!(greeting.map(String::as_str), Some("hello plugins"));
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration-driven services
//!
//! ```rust
//! use std::sync::Arc;
//! use plugin_lifecycle::config::{MemoryConfigProvider, ServicesConfig};
//! use plugin_lifecycle::plugins::{LoadValue, StaticFinder};
//! use plugin_lifecycle::services::{SERVICES_NAMESPACE, ServicePlugin, ServiceRegistry};
//!
//! # fn main() -> Result<(), plugin_lifecycle::Error> {
//! let provider = MemoryConfigProvider::new().value("services", "s3");
//! let config = Arc::new(ServicesConfig::from_provider(&provider)?);
//!
//! let finder = StaticFinder::new()
//!     .spec(ServicePlugin::new("s3", "default", config.clone(), |_| Ok(LoadValue::new(1u8)))
//!         .into_spec(SERVICES_NAMESPACE))
//!     .spec(ServicePlugin::new("sqs", "default", config, |_| Ok(LoadValue::new(2u8)))
//!         .into_spec(SERVICES_NAMESPACE));
//!
//! let registry = ServiceRegistry::new(SERVICES_NAMESPACE, &finder)?;
//! assert!(registry.get_service("s3").is_ok());
//! assert!(registry.get_service("sqs").is_err());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod plugins;
pub mod prelude;
pub mod services;

// Re-exports for convenience
pub use config::{
    CompositeConfigProvider, ConfigBuilder, ConfigError, ConfigProvider, ConfigProviderExt,
    ServicesConfig,
};
pub use plugins::{
    BoxError, EntryPoint, EntryPointRegistry, LoadArgs, LoadValue, ManagedPlugin, Plugin,
    PluginFinder, PluginLifecycleListener, PluginManager, PluginManagerBuilder, PluginSource,
    PluginSpec, PluginState, StaticFinder,
};
pub use services::{ServicePlugin, ServiceRegistry};

/// Error type for plugin-lifecycle operations.
///
/// Failures of individual plugins are reported to lifecycle listeners and
/// never surface here; these errors cover lookups, discovery and configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No plugin with this name was resolved in the namespace.
    #[error("Plugin not found: {namespace}:{name}")]
    PluginNotFound { namespace: String, name: String },

    /// The plugin exists but is not loaded.
    #[error("Plugin {namespace}:{name} is not loaded (state: {state})")]
    NotLoaded {
        namespace: String,
        name: String,
        state: PluginState,
    },

    /// The discovery collaborator failed as a whole.
    #[error("Plugin discovery failed: {0}")]
    Discovery(#[from] plugins::DiscoveryError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or invalid.
    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown plugin or a plugin that is not available
    Lookup,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Internal errors (IO, discovery backend)
    Internal,
}

impl Error {
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Error::PluginNotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PluginNotFound { .. } | Error::NotLoaded { .. } => ErrorCategory::Lookup,
            Error::Config(_) | Error::Json(_) | Error::Env(_) => ErrorCategory::Configuration,
            Error::Discovery(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PluginNotFound { .. })
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Env(e),
            config::ConfigError::Provider { message } => Error::Config(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
