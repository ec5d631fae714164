//! Plugin discovery and lifecycle management.
//!
//! A [`PluginManager`] owns the plugins of one namespace. At construction it asks a
//! [`PluginFinder`] for the namespace's raw sources and resolves each into a
//! [`PluginSpec`]. Plugins are then instantiated and loaded lazily, at most once:
//!
//! ```text
//! discovered ──factory──▶ instantiated ──should_load?──▶ declined
//!                              │
//!                              └──load──▶ loaded
//!                                    └──▶ load_failed (retried on next call)
//! ```
//!
//! Each managed plugin has its own lock, so loading one plugin never blocks
//! another. Listener callbacks observe every transition; a failing listener is
//! logged and ignored.
//!
//! # Example
//!
//! ```rust
//! use plugin_lifecycle::plugins::{
//!     BoxError, LoadArgs, LoadValue, Plugin, PluginManager, PluginSpec, StaticFinder,
//! };
//!
//! struct Hello;
//!
//! impl Plugin for Hello {
//!     fn load(&mut self, _args: &LoadArgs) -> Result<LoadValue, BoxError> {
//!         Ok(LoadValue::new("hello"))
//!     }
//! }
//!
//! # fn main() -> Result<(), plugin_lifecycle::Error> {
//! let finder = StaticFinder::new().spec(PluginSpec::from_constructor("demo", "hello", || Hello));
//! let manager = PluginManager::new("demo", &finder)?;
//!
//! let holder = manager.load("hello")?;
//! assert!(holder.is_loaded());
//! # Ok(())
//! # }
//! ```

mod collector;
mod discovery;
mod error;
mod listener;
mod managed;
mod manager;
pub mod namespace;
mod plugin;
mod resolver;
mod spec;
#[cfg(test)]
mod testing;

pub use collector::{EntryPointMap, PluginCollector, spec_to_entry_point, to_entry_point_map};
pub use discovery::{
    Discovered, DiscoveredSource, DiscoveryFailure, EntryPoint, EntryPointRegistry,
    PluginFinder, StaticFinder,
};
pub use error::{
    BoxError, DiscoveryError, InstantiationError, ListenerError, LoadError, PanicError,
    ResolutionError,
};
pub use listener::PluginLifecycleListener;
pub use managed::{ManagedPlugin, PluginState};
pub use manager::{PluginManager, PluginManagerBuilder};
pub use plugin::{LoadArgs, LoadValue, Plugin, PluginClass};
pub use resolver::{PluginSource, PluginSpecResolver, PluginType, SpecFactory};
pub use spec::{FactoryRef, PluginFactory, PluginSpec};
