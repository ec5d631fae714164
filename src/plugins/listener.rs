//! Lifecycle listeners and guarded event dispatch.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::discovery::EntryPoint;
use super::error::{InstantiationError, ListenerError, LoadError, PanicError, ResolutionError};
use super::plugin::{LoadArgs, LoadValue, Plugin};
use super::spec::PluginSpec;

/// Observer of plugin resolution, instantiation and load transitions.
///
/// Every method is a no-op by default. Callbacks run synchronously on the thread
/// driving the transition, while that plugin's lock is held. A panicking callback
/// is logged and otherwise ignored.
pub trait PluginLifecycleListener: Send + Sync {
    fn on_resolve_after(&self, _spec: &PluginSpec) {}

    fn on_resolve_exception(&self, _namespace: &str, _entry: &EntryPoint, _error: &ResolutionError) {
    }

    fn on_init_after(&self, _spec: &PluginSpec, _plugin: &dyn Plugin) {}

    fn on_init_exception(&self, _spec: &PluginSpec, _error: &InstantiationError) {}

    fn on_load_before(&self, _spec: &PluginSpec, _plugin: &dyn Plugin, _args: &LoadArgs) {}

    fn on_load_after(&self, _spec: &PluginSpec, _plugin: &dyn Plugin, _result: &LoadValue) {}

    fn on_load_exception(&self, _spec: &PluginSpec, _plugin: &dyn Plugin, _error: &LoadError) {}
}

/// Calls `f`, logging and swallowing any panic it raises.
fn call_safe(callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let error = ListenerError {
            callback,
            message: PanicError::from_payload(payload.as_ref()).message,
        };
        tracing::error!(callback, error = %error, "Lifecycle listener failed");
        tracing::debug!(callback, error = ?error, "Lifecycle listener failure detail");
    }
}

/// Fans lifecycle events out to registered listeners, each call guarded.
#[derive(Clone, Default)]
pub(crate) struct LifecycleNotifier {
    listeners: Vec<Arc<dyn PluginLifecycleListener>>,
}

impl LifecycleNotifier {
    pub(crate) fn new(listeners: Vec<Arc<dyn PluginLifecycleListener>>) -> Self {
        Self { listeners }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn resolve_after(&self, spec: &PluginSpec) {
        for l in &self.listeners {
            call_safe("on_resolve_after", || l.on_resolve_after(spec));
        }
    }

    pub(crate) fn resolve_exception(
        &self,
        namespace: &str,
        entry: &EntryPoint,
        error: &ResolutionError,
    ) {
        for l in &self.listeners {
            call_safe("on_resolve_exception", || {
                l.on_resolve_exception(namespace, entry, error)
            });
        }
    }

    pub(crate) fn init_after(&self, spec: &PluginSpec, plugin: &dyn Plugin) {
        for l in &self.listeners {
            call_safe("on_init_after", || l.on_init_after(spec, plugin));
        }
    }

    pub(crate) fn init_exception(&self, spec: &PluginSpec, error: &InstantiationError) {
        for l in &self.listeners {
            call_safe("on_init_exception", || l.on_init_exception(spec, error));
        }
    }

    pub(crate) fn load_before(&self, spec: &PluginSpec, plugin: &dyn Plugin, args: &LoadArgs) {
        for l in &self.listeners {
            call_safe("on_load_before", || l.on_load_before(spec, plugin, args));
        }
    }

    pub(crate) fn load_after(&self, spec: &PluginSpec, plugin: &dyn Plugin, result: &LoadValue) {
        for l in &self.listeners {
            call_safe("on_load_after", || l.on_load_after(spec, plugin, result));
        }
    }

    pub(crate) fn load_exception(&self, spec: &PluginSpec, plugin: &dyn Plugin, error: &LoadError) {
        for l in &self.listeners {
            call_safe("on_load_exception", || {
                l.on_load_exception(spec, plugin, error)
            });
        }
    }
}
