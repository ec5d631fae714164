//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! for defining and managing plugins.
//!
//! # Usage
//!
//! ```rust
//! use plugin_lifecycle::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::Result;

// Plugins
pub use crate::plugins::{
    BoxError, LoadArgs, LoadValue, Plugin, PluginClass, PluginSpec, PluginState,
};

// Lifecycle
pub use crate::plugins::{ManagedPlugin, PluginLifecycleListener, PluginManager};

// Discovery
pub use crate::plugins::{EntryPoint, EntryPointRegistry, PluginFinder, PluginSource, StaticFinder};

// Configuration
pub use crate::config::{ConfigProvider, ConfigProviderExt, ServicesConfig};

// Services
pub use crate::services::{ServicePlugin, ServiceRegistry};
