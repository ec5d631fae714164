use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Error, Result};

use super::collector::PluginCollector;
use super::discovery::{DiscoveredSource, EntryPoint, PluginFinder};
use super::error::{InstantiationError, LoadError, ResolutionError, catch};
use super::listener::{LifecycleNotifier, PluginLifecycleListener};
use super::managed::{ManagedPlugin, PluginState};
use super::plugin::LoadArgs;
use super::resolver::PluginSpecResolver;
use super::spec::PluginSpec;

/// Manages the plugins of one namespace: resolves them once at construction,
/// then instantiates and loads each lazily, at most once, on demand.
///
/// Failures of a single plugin (resolution, instantiation, load) are reported to
/// the lifecycle listeners and reflected in that plugin's state; they never
/// propagate out of `load`, `load_all` or construction. Only unknown plugin
/// names are returned as errors.
pub struct PluginManager {
    namespace: String,
    load_args: LoadArgs,
    notifier: LifecycleNotifier,
    plugins: Vec<ManagedPlugin>,
    index: HashMap<String, usize>,
}

impl PluginManager {
    /// Discovers the plugins of `namespace` with no load arguments and no listeners.
    pub fn new(namespace: impl Into<String>, finder: &dyn PluginFinder) -> Result<Self> {
        Self::builder(namespace).build(finder)
    }

    pub fn builder(namespace: impl Into<String>) -> PluginManagerBuilder {
        PluginManagerBuilder::new(namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn load_args(&self) -> &LoadArgs {
        &self.load_args
    }

    /// Resolved specs, in discovery order.
    pub fn list_resolved(&self) -> Vec<PluginSpec> {
        self.plugins.iter().map(|h| h.spec().clone()).collect()
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the holder without loading it.
    pub fn get(&self, name: &str) -> Option<&ManagedPlugin> {
        self.index.get(name).map(|&i| &self.plugins[i])
    }

    pub fn is_loaded(&self, name: &str) -> Result<bool> {
        Ok(self.require_plugin(name)?.is_loaded())
    }

    pub fn is_instantiated(&self, name: &str) -> Result<bool> {
        Ok(self.require_plugin(name)?.is_instantiated())
    }

    pub fn state(&self, name: &str) -> Result<PluginState> {
        Ok(self.require_plugin(name)?.state())
    }

    /// Loads the named plugin if it is not loaded yet and returns its holder.
    ///
    /// The holder is returned whatever the outcome; check
    /// [`ManagedPlugin::is_loaded`] to see whether loading succeeded. Failures are
    /// reported to the lifecycle listeners.
    pub fn load(&self, name: &str) -> Result<&ManagedPlugin> {
        let holder = self.require_plugin(name)?;
        if !holder.is_loaded() {
            self.load_plugin(holder);
        }
        Ok(holder)
    }

    /// Loads every plugin not loaded yet and returns the holders that are loaded
    /// afterwards, in discovery order.
    pub fn load_all(&self) -> Vec<&ManagedPlugin> {
        let mut loaded = Vec::with_capacity(self.plugins.len());

        for holder in &self.plugins {
            if !holder.is_loaded() {
                self.load_plugin(holder);
            }
            if holder.is_loaded() {
                loaded.push(holder);
            }
        }

        loaded
    }

    /// Runs [`load_all`](Self::load_all) and maps every loaded holder through `f`.
    pub fn map_load<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&ManagedPlugin) -> T,
    {
        self.load_all().into_iter().map(f).collect()
    }

    fn require_plugin(&self, name: &str) -> Result<&ManagedPlugin> {
        self.get(name).ok_or_else(|| Error::PluginNotFound {
            namespace: self.namespace.clone(),
            name: name.to_string(),
        })
    }

    fn load_plugin(&self, holder: &ManagedPlugin) {
        let mut slot = holder.lock();

        // Another thread may have finished while we waited for the lock.
        if holder.state().is_terminal() {
            return;
        }

        let spec = holder.spec();

        if slot.is_none() {
            tracing::debug!(plugin = %spec, "Instantiating plugin");
            match spec.instantiate() {
                Ok(instance) => {
                    let instance = slot.insert(instance);
                    holder.set_state(PluginState::Instantiated);
                    self.notifier.init_after(spec, &**instance);
                }
                Err(source) => {
                    let error = InstantiationError {
                        plugin: spec.id(),
                        source,
                    };
                    tracing::warn!(plugin = %spec, error = %error.source, "Plugin instantiation failed");
                    tracing::debug!(plugin = %spec, error = ?error, "Plugin instantiation failure detail");
                    self.notifier.init_exception(spec, &error);
                    return;
                }
            }
        }

        let Some(plugin) = slot.as_mut() else {
            return;
        };

        let should_load = match catch(|| Ok(plugin.should_load())) {
            Ok(should_load) => should_load,
            Err(source) => {
                let error = LoadError {
                    plugin: spec.id(),
                    source,
                };
                tracing::warn!(plugin = %spec, error = %error.source, "Plugin activation check failed");
                tracing::debug!(plugin = %spec, error = ?error, "Plugin activation check failure detail");
                holder.set_state(PluginState::LoadFailed);
                self.notifier.load_exception(spec, &**plugin, &error);
                return;
            }
        };

        if !should_load {
            tracing::debug!(plugin = %spec, "Not loading deactivated plugin");
            holder.set_state(PluginState::Declined);
            return;
        }

        self.notifier.load_before(spec, &**plugin, &self.load_args);

        tracing::debug!(plugin = %spec, "Loading plugin");
        match catch(|| plugin.load(&self.load_args)) {
            Ok(value) => {
                self.notifier.load_after(spec, &**plugin, &value);
                holder.set_loaded(value);
                tracing::info!(plugin = %spec, "Plugin loaded");
            }
            Err(source) => {
                let error = LoadError {
                    plugin: spec.id(),
                    source,
                };
                tracing::warn!(plugin = %spec, error = %error.source, "Plugin load failed");
                tracing::debug!(plugin = %spec, error = ?error, "Plugin load failure detail");
                holder.set_state(PluginState::LoadFailed);
                self.notifier.load_exception(spec, &**plugin, &error);
            }
        }
    }
}

impl PluginCollector for PluginManager {
    fn collect_plugins(&self) -> Vec<PluginSpec> {
        self.list_resolved()
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("namespace", &self.namespace)
            .field("plugins", &self.plugins)
            .field("listeners", &self.notifier.len())
            .finish()
    }
}

/// Builder for [`PluginManager`].
pub struct PluginManagerBuilder {
    namespace: String,
    load_args: LoadArgs,
    listeners: Vec<Arc<dyn PluginLifecycleListener>>,
    resolver: PluginSpecResolver,
}

impl PluginManagerBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            load_args: LoadArgs::default(),
            listeners: Vec::new(),
            resolver: PluginSpecResolver::new(),
        }
    }

    pub fn load_args(mut self, args: LoadArgs) -> Self {
        self.load_args = args;
        self
    }

    pub fn listener<L: PluginLifecycleListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn listener_arc(mut self, listener: Arc<dyn PluginLifecycleListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Discovers and resolves the namespace's plugins.
    ///
    /// Fails only if `finder` itself cannot enumerate the namespace.
    pub fn build(self, finder: &dyn PluginFinder) -> Result<PluginManager> {
        let discovered = finder.find_plugins(&self.namespace)?;
        let notifier = LifecycleNotifier::new(self.listeners);

        let mut manager = PluginManager {
            namespace: self.namespace,
            load_args: self.load_args,
            notifier,
            plugins: Vec::with_capacity(discovered.sources.len()),
            index: HashMap::with_capacity(discovered.sources.len()),
        };

        let mut failed = discovered.failures.len();

        for failure in discovered.failures {
            tracing::warn!(
                namespace = %failure.namespace,
                entry = %failure.entry,
                error = %failure.error,
                "Plugin entry point could not be loaded"
            );
            let error = ResolutionError::Discovery(failure.error);
            manager
                .notifier
                .resolve_exception(&failure.namespace, &failure.entry, &error);
        }

        for DiscoveredSource { entry, source } in discovered.sources {
            match self.resolver.resolve(source).and_then(|spec| manager.admit(spec)) {
                Ok(spec) => {
                    manager.notifier.resolve_after(&spec);
                    manager
                        .index
                        .insert(spec.name().to_string(), manager.plugins.len());
                    manager.plugins.push(ManagedPlugin::new(spec));
                }
                Err(error) => {
                    failed += 1;
                    manager.resolve_failed(&entry, &error);
                }
            }
        }

        tracing::info!(
            namespace = %manager.namespace,
            resolved = manager.plugins.len(),
            failed,
            "Plugins discovered"
        );

        Ok(manager)
    }
}

impl PluginManager {
    /// Rejects specs that belong to another namespace or reuse a resolved name.
    fn admit(&self, spec: PluginSpec) -> std::result::Result<PluginSpec, ResolutionError> {
        if spec.namespace() != self.namespace {
            return Err(ResolutionError::InvalidSpec {
                reason: format!(
                    "plugin '{}' belongs to namespace '{}', not '{}'",
                    spec.name(),
                    spec.namespace(),
                    self.namespace
                ),
            });
        }
        if self.exists(spec.name()) {
            return Err(ResolutionError::InvalidSpec {
                reason: format!(
                    "duplicate plugin name '{}' in namespace '{}'",
                    spec.name(),
                    self.namespace
                ),
            });
        }
        Ok(spec)
    }

    fn resolve_failed(&self, entry: &EntryPoint, error: &ResolutionError) {
        tracing::warn!(
            namespace = %self.namespace,
            entry = %entry,
            error = %error,
            "Plugin resolution failed"
        );
        self.notifier
            .resolve_exception(&self.namespace, entry, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{BoxError, LoadValue, Plugin, PluginSource, StaticFinder};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl PluginLifecycleListener for Recorder {
        fn on_resolve_after(&self, spec: &PluginSpec) {
            self.push(format!("resolve_after:{}", spec.name()));
        }

        fn on_resolve_exception(&self, _namespace: &str, entry: &EntryPoint, _error: &ResolutionError) {
            self.push(format!("resolve_exception:{}", entry.name));
        }

        fn on_init_after(&self, spec: &PluginSpec, _plugin: &dyn Plugin) {
            self.push(format!("init_after:{}", spec.name()));
        }

        fn on_init_exception(&self, spec: &PluginSpec, _error: &InstantiationError) {
            self.push(format!("init_exception:{}", spec.name()));
        }

        fn on_load_before(&self, spec: &PluginSpec, _plugin: &dyn Plugin, _args: &LoadArgs) {
            self.push(format!("load_before:{}", spec.name()));
        }

        fn on_load_after(&self, spec: &PluginSpec, _plugin: &dyn Plugin, _result: &LoadValue) {
            self.push(format!("load_after:{}", spec.name()));
        }

        fn on_load_exception(&self, spec: &PluginSpec, _plugin: &dyn Plugin, _error: &LoadError) {
            self.push(format!("load_exception:{}", spec.name()));
        }
    }

    struct Fixed {
        active: bool,
        value: &'static str,
    }

    impl Plugin for Fixed {
        fn should_load(&self) -> bool {
            self.active
        }

        fn load(&mut self, _args: &LoadArgs) -> std::result::Result<LoadValue, BoxError> {
            Ok(LoadValue::new(self.value))
        }
    }

    /// Fails the first `failures` load attempts.
    struct Flaky {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    impl Plugin for Flaky {
        fn load(&mut self, _args: &LoadArgs) -> std::result::Result<LoadValue, BoxError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(format!("attempt {} failed", attempt + 1).into());
            }
            Ok(LoadValue::new(attempt + 1))
        }
    }

    fn fixed(name: &'static str, active: bool, value: &'static str) -> PluginSpec {
        PluginSpec::from_constructor("svc", name, move || Fixed { active, value })
    }

    fn manager_with(finder: StaticFinder) -> (PluginManager, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let manager = PluginManager::builder("svc")
            .listener_arc(recorder.clone())
            .build(&finder)
            .unwrap();
        (manager, recorder)
    }

    #[test]
    fn test_construction_resolves_without_loading() {
        let finder = StaticFinder::new()
            .spec(fixed("a", true, "ok-A"))
            .spec(fixed("b", false, "ok-B"));
        let (manager, recorder) = manager_with(finder);

        assert_eq!(manager.namespace(), "svc");
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.list_names(), ["a", "b"]);
        assert!(manager.exists("a"));
        assert!(!manager.exists("c"));
        assert!(!manager.is_loaded("a").unwrap());
        assert!(!manager.is_instantiated("b").unwrap());
        assert_eq!(recorder.events(), ["resolve_after:a", "resolve_after:b"]);
    }

    #[test]
    fn test_load_event_order() {
        let (manager, recorder) = manager_with(StaticFinder::new().spec(fixed("a", true, "ok-A")));

        let holder = manager.load("a").unwrap();
        assert!(holder.is_loaded());
        assert_eq!(holder.state(), PluginState::Loaded);
        assert_eq!(
            holder.load_value().unwrap().downcast_ref::<&str>(),
            Some(&"ok-A")
        );
        assert_eq!(
            recorder.events(),
            [
                "resolve_after:a",
                "init_after:a",
                "load_before:a",
                "load_after:a"
            ]
        );
    }

    #[test]
    fn test_declined_plugin_is_not_loaded() {
        let (manager, recorder) = manager_with(StaticFinder::new().spec(fixed("b", false, "ok-B")));

        let holder = manager.load("b").unwrap();
        assert!(!holder.is_loaded());
        assert!(holder.is_instantiated());
        assert_eq!(holder.state(), PluginState::Declined);

        manager.load("b").unwrap();
        assert_eq!(recorder.events(), ["resolve_after:b", "init_after:b"]);
    }

    #[test]
    fn test_load_is_terminal() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let spec = PluginSpec::from_constructor("svc", "once", move || Flaky {
            failures: 0,
            attempts: counter.clone(),
        });
        let (manager, _) = manager_with(StaticFinder::new().spec(spec));

        let first = manager.load("once").unwrap().load_value().cloned().unwrap();
        let second = manager.load("once").unwrap().load_value().cloned().unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried_without_reinstantiating() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let instances = Arc::new(AtomicUsize::new(0));
        let (counter, created) = (attempts.clone(), instances.clone());
        let spec = PluginSpec::from_constructor("svc", "flaky", move || {
            created.fetch_add(1, Ordering::SeqCst);
            Flaky {
                failures: 1,
                attempts: counter.clone(),
            }
        });
        let (manager, recorder) = manager_with(StaticFinder::new().spec(spec));

        let holder = manager.load("flaky").unwrap();
        assert!(!holder.is_loaded());
        assert_eq!(holder.state(), PluginState::LoadFailed);

        let holder = manager.load("flaky").unwrap();
        assert!(holder.is_loaded());
        assert_eq!(holder.load_value().unwrap().downcast_ref::<usize>(), Some(&2));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(instances.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.events(),
            [
                "resolve_after:flaky",
                "init_after:flaky",
                "load_before:flaky",
                "load_exception:flaky",
                "load_before:flaky",
                "load_after:flaky"
            ]
        );
    }

    #[test]
    fn test_load_failure_detail_logged_at_debug() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let spec = PluginSpec::from_constructor("svc", "flaky", move || Flaky {
            failures: 1,
            attempts: counter.clone(),
        });
        let (manager, _recorder) = manager_with(StaticFinder::new().spec(spec));

        let logs = crate::plugins::testing::capture_logs(|| {
            manager.load("flaky").unwrap();
        });

        assert!(logs.contains("WARN"));
        assert!(logs.contains("Plugin load failed"));
        assert!(logs.contains("Plugin load failure detail"));
        assert!(logs.contains("attempt 1 failed"));
    }

    #[test]
    fn test_instantiation_failure_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = PluginSpec::new("svc", "late", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err("not ready".into());
            }
            Ok(Box::new(Fixed {
                active: true,
                value: "late",
            }) as Box<dyn Plugin>)
        });
        let (manager, recorder) = manager_with(StaticFinder::new().spec(spec));

        let holder = manager.load("late").unwrap();
        assert!(!holder.is_instantiated());
        assert_eq!(holder.state(), PluginState::Discovered);

        assert!(manager.load("late").unwrap().is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            recorder.events()[1..],
            [
                "init_exception:late",
                "init_after:late",
                "load_before:late",
                "load_after:late"
            ]
        );
    }

    #[test]
    fn test_panicking_load_is_contained() {
        struct Panicky;

        impl Plugin for Panicky {
            fn load(&mut self, _args: &LoadArgs) -> std::result::Result<LoadValue, BoxError> {
                panic!("load exploded");
            }
        }

        let finder = StaticFinder::new()
            .spec(PluginSpec::from_constructor("svc", "panicky", || Panicky))
            .spec(fixed("a", true, "ok-A"));
        let (manager, recorder) = manager_with(finder);

        let loaded = manager.load_all();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name(), "a");
        assert_eq!(manager.state("panicky").unwrap(), PluginState::LoadFailed);
        assert!(recorder.events().contains(&"load_exception:panicky".to_string()));
    }

    #[test]
    fn test_resolution_failures_are_omitted() {
        let finder = StaticFinder::new()
            .spec(fixed("a", true, "ok-A"))
            .source("svc", "c", PluginSource::Unrecognized("opaque".into()))
            .spec(fixed("a", true, "duplicate"))
            .source("svc", "foreign", PluginSource::Spec(
                PluginSpec::from_constructor("other", "foreign", || Fixed {
                    active: true,
                    value: "x",
                }),
            ));
        let (manager, recorder) = manager_with(finder);

        assert_eq!(manager.list_names(), ["a"]);
        assert!(!manager.exists("c"));
        assert!(!manager.exists("foreign"));
        assert_eq!(
            recorder.events(),
            [
                "resolve_after:a",
                "resolve_exception:c",
                "resolve_exception:a",
                "resolve_exception:foreign"
            ]
        );
    }

    #[test]
    fn test_unknown_plugin() {
        let (manager, _) = manager_with(StaticFinder::new());
        assert!(manager.is_empty());

        let err = manager.load("missing").unwrap_err();
        assert!(matches!(err, Error::PluginNotFound { ref name, .. } if name == "missing"));
        assert!(manager.is_loaded("missing").is_err());
        assert!(manager.get("missing").is_none());
    }

    #[test]
    fn test_map_load_and_collector() {
        let finder = StaticFinder::new()
            .spec(fixed("a", true, "ok-A"))
            .spec(fixed("b", false, "ok-B"))
            .spec(fixed("c", true, "ok-C"));
        let (manager, _) = manager_with(finder);

        let values = manager.map_load(|h| {
            *h.load_value()
                .and_then(|v| v.downcast_ref::<&str>())
                .unwrap()
        });
        assert_eq!(values, ["ok-A", "ok-C"]);

        let entry_points = manager.entry_points();
        assert_eq!(entry_points["svc"].len(), 3);
        assert!(entry_points["svc"][0].starts_with("a="));
    }

    #[test]
    fn test_load_args_are_passed() {
        struct Echo;

        impl Plugin for Echo {
            fn load(&mut self, args: &LoadArgs) -> std::result::Result<LoadValue, BoxError> {
                Ok(LoadValue::new(args.clone()))
            }
        }

        let args = LoadArgs::new().arg("ctx").kwarg("region", "eu-west-1");
        let manager = PluginManager::builder("svc")
            .load_args(args.clone())
            .build(&StaticFinder::new().spec(PluginSpec::from_constructor("svc", "echo", || Echo)))
            .unwrap();

        assert_eq!(manager.load_args(), &args);
        let holder = manager.load("echo").unwrap();
        assert_eq!(holder.load_value().unwrap().downcast_ref::<LoadArgs>(), Some(&args));
    }
}
