//! Per-plugin runtime state held by a [`PluginManager`](super::PluginManager).

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;

use super::plugin::{LoadValue, Plugin};
use super::spec::PluginSpec;

/// Lifecycle state of a managed plugin. Transitions only move forward, except that
/// `LoadFailed` may be followed by another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Resolved but the factory has not produced an instance yet.
    Discovered,
    /// Instance exists; activation has not been decided yet.
    Instantiated,
    /// `should_load` returned false. Terminal.
    Declined,
    /// `load` succeeded. Terminal.
    Loaded,
    /// The last `load` attempt failed; a later call retries it.
    LoadFailed,
}

impl PluginState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PluginState::Instantiated,
            2 => PluginState::Declined,
            3 => PluginState::Loaded,
            4 => PluginState::LoadFailed,
            _ => PluginState::Discovered,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PluginState::Discovered => 0,
            PluginState::Instantiated => 1,
            PluginState::Declined => 2,
            PluginState::Loaded => 3,
            PluginState::LoadFailed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PluginState::Declined | PluginState::Loaded)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginState::Discovered => write!(f, "discovered"),
            PluginState::Instantiated => write!(f, "instantiated"),
            PluginState::Declined => write!(f, "declined"),
            PluginState::Loaded => write!(f, "loaded"),
            PluginState::LoadFailed => write!(f, "load_failed"),
        }
    }
}

/// Holder for one plugin: its spec, its lock-protected instance, and its load result.
///
/// `is_loaded` and `state` read atomics and never block; the instance itself
/// is only touched under the holder's lock.
pub struct ManagedPlugin {
    spec: PluginSpec,
    slot: Mutex<Option<Box<dyn Plugin>>>,
    state: AtomicU8,
    load_value: OnceLock<LoadValue>,
}

impl ManagedPlugin {
    pub(crate) fn new(spec: PluginSpec) -> Self {
        Self {
            spec,
            slot: Mutex::new(None),
            state: AtomicU8::new(PluginState::Discovered.as_u8()),
            load_value: OnceLock::new(),
        }
    }

    pub fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn state(&self) -> PluginState {
        PluginState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_instantiated(&self) -> bool {
        self.state() != PluginState::Discovered
    }

    pub fn is_loaded(&self) -> bool {
        self.load_value.get().is_some()
    }

    /// Result of the successful `load`, if any.
    pub fn load_value(&self) -> Option<&LoadValue> {
        self.load_value.get()
    }

    /// Runs `f` against the plugin instance, waiting for the holder's lock.
    /// Returns `None` if the plugin was never instantiated.
    pub fn with_plugin<R>(&self, f: impl FnOnce(&dyn Plugin) -> R) -> Option<R> {
        self.lock().as_deref().map(|plugin| f(plugin))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Plugin>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: PluginState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Records the load result. Must be called with the lock held; the first value wins.
    pub(crate) fn set_loaded(&self, value: LoadValue) {
        if self.load_value.set(value).is_err() {
            tracing::warn!(plugin = %self.spec, "Load value already recorded");
        }
        self.set_state(PluginState::Loaded);
    }
}

impl fmt::Debug for ManagedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedPlugin")
            .field("spec", &self.spec.id())
            .field("state", &self.state())
            .field("load_value", &self.load_value.get())
            .finish()
    }
}
