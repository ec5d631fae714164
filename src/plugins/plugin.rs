//! The plugin capability and the values that flow through `load`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BoxError;

/// Behavior contract implemented by concrete plugins.
///
/// Constructing a plugin should be cheap (capture configuration, nothing more).
/// Heavy side effects belong in [`Plugin::load`], which only runs once
/// [`Plugin::should_load`] has agreed to it.
///
/// # Example
///
/// ```rust
/// use plugin_lifecycle::plugins::{BoxError, LoadArgs, LoadValue, Plugin};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Plugin for Greeter {
///     fn load(&mut self, _args: &LoadArgs) -> Result<LoadValue, BoxError> {
///         Ok(LoadValue::new(self.greeting.clone()))
///     }
/// }
/// ```
pub trait Plugin: Send {
    /// Returns false to skip loading. Declining is not an error.
    fn should_load(&self) -> bool {
        true
    }

    /// Performs the plugin's load side effects and returns its load result.
    fn load(&mut self, args: &LoadArgs) -> Result<LoadValue, BoxError>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plugin")
    }
}

/// A plugin type that declares its own identity and can be built without arguments.
///
/// Types implementing this can be handed to discovery directly, see
/// [`PluginSource::of_type`](super::PluginSource::of_type).
pub trait PluginClass: Plugin + Default + 'static {
    const NAMESPACE: &'static str;
    const NAME: &'static str;

    /// Requirement tags carried into the resolved spec.
    fn requirements() -> Vec<String> {
        Vec::new()
    }
}

/// Positional and keyword arguments handed to every `Plugin::load` call of a manager.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadArgs {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl LoadArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// Result of a successful `Plugin::load`. Clones share the same value.
#[derive(Clone)]
pub struct LoadValue(Arc<dyn Any + Send + Sync>);

impl LoadValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// A load result carrying no data.
    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Returns true if both handles point at the same value.
    pub fn ptr_eq(&self, other: &LoadValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LoadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.downcast_ref::<&'static str>() {
            f.debug_tuple("LoadValue").field(s).finish()
        } else if let Some(s) = self.downcast_ref::<String>() {
            f.debug_tuple("LoadValue").field(s).finish()
        } else if let Some(v) = self.downcast_ref::<Value>() {
            f.debug_tuple("LoadValue").field(v).finish()
        } else {
            f.write_str("LoadValue(..)")
        }
    }
}
