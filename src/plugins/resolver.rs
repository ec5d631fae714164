//! Normalization of heterogeneous discovery sources into [`PluginSpec`]s.

use std::fmt;
use std::sync::Arc;

use super::error::{BoxError, ResolutionError, catch};
use super::namespace;
use super::plugin::{Plugin, PluginClass};
use super::spec::{FactoryRef, PluginSpec};

/// A plugin type declaring its own namespace and name, built via `Default`.
#[derive(Clone, Copy)]
pub struct PluginType {
    namespace: &'static str,
    name: &'static str,
    construct: fn() -> Box<dyn Plugin>,
    requirements: fn() -> Vec<String>,
    type_name: &'static str,
}

impl PluginType {
    pub fn of<T: PluginClass>() -> Self {
        Self {
            namespace: T::NAMESPACE,
            name: T::NAME,
            construct: construct_default::<T>,
            requirements: T::requirements,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn construct_default<T: PluginClass>() -> Box<dyn Plugin> {
    Box::new(T::default())
}

impl fmt::Debug for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginType")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

/// Zero-argument callable that produces a [`PluginSpec`] when invoked.
#[derive(Clone)]
pub struct SpecFactory {
    reference: FactoryRef,
    produce: Arc<dyn Fn() -> Result<PluginSpec, BoxError> + Send + Sync>,
}

impl SpecFactory {
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> Result<PluginSpec, BoxError> + Send + Sync + 'static,
    {
        Self {
            reference: FactoryRef::of::<F>(),
            produce: Arc::new(produce),
        }
    }

    pub fn reference(&self) -> &FactoryRef {
        &self.reference
    }
}

impl fmt::Debug for SpecFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpecFactory")
            .field(&self.reference.to_string())
            .finish()
    }
}

/// Raw descriptor source handed out by discovery.
#[derive(Clone, Debug)]
pub enum PluginSource {
    /// Already a spec; resolves to itself.
    Spec(PluginSpec),
    /// A plugin type to wrap; its factory is the type's `Default`.
    Type(PluginType),
    /// A callable producing the spec.
    SpecFactory(SpecFactory),
    /// Anything discovery could load but not classify.
    Unrecognized(String),
}

impl PluginSource {
    pub fn of_type<T: PluginClass>() -> Self {
        Self::Type(PluginType::of::<T>())
    }

    pub fn spec_fn<F>(produce: F) -> Self
    where
        F: Fn() -> Result<PluginSpec, BoxError> + Send + Sync + 'static,
    {
        Self::SpecFactory(SpecFactory::new(produce))
    }

    /// Short human-readable description, used as the entry value for sources
    /// without a declared reference.
    pub fn describe(&self) -> String {
        match self {
            PluginSource::Spec(spec) => spec.get_factory_ref().to_string(),
            PluginSource::Type(ty) => FactoryRef::from_type_name(ty.type_name).to_string(),
            PluginSource::SpecFactory(factory) => factory.reference.to_string(),
            PluginSource::Unrecognized(description) => description.clone(),
        }
    }
}

impl From<PluginSpec> for PluginSource {
    fn from(spec: PluginSpec) -> Self {
        Self::Spec(spec)
    }
}

/// Converts a [`PluginSource`] into a canonical [`PluginSpec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginSpecResolver;

impl PluginSpecResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, source: PluginSource) -> Result<PluginSpec, ResolutionError> {
        let spec = match source {
            PluginSource::Spec(spec) => spec,
            PluginSource::Type(ty) => {
                let construct = ty.construct;
                PluginSpec::new(ty.namespace, ty.name, move || Ok(construct()))
                    .factory_ref(FactoryRef::from_type_name(ty.type_name))
                    .requirements((ty.requirements)())
            }
            PluginSource::SpecFactory(factory) => {
                let produce = Arc::clone(&factory.produce);
                catch(|| produce()).map_err(|error| ResolutionError::SpecFactory {
                    factory: factory.reference.to_string(),
                    error,
                })?
            }
            PluginSource::Unrecognized(description) => {
                return Err(ResolutionError::Unrecognized { description });
            }
        };

        Self::validate(&spec)?;
        Ok(spec)
    }

    fn validate(spec: &PluginSpec) -> Result<(), ResolutionError> {
        if !namespace::is_valid_namespace(spec.namespace()) {
            return Err(ResolutionError::InvalidSpec {
                reason: format!("invalid namespace '{}'", spec.namespace()),
            });
        }
        if !namespace::is_valid_name(spec.name()) {
            return Err(ResolutionError::InvalidSpec {
                reason: format!(
                    "invalid name '{}' in namespace '{}'",
                    spec.name(),
                    spec.namespace()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{LoadArgs, LoadValue};

    #[derive(Default)]
    struct KinesisMock;

    impl Plugin for KinesisMock {
        fn load(&mut self, _args: &LoadArgs) -> Result<LoadValue, BoxError> {
            Ok(LoadValue::new("kinesis"))
        }
    }

    impl PluginClass for KinesisMock {
        const NAMESPACE: &'static str = "aws.providers.kinesis";
        const NAME: &'static str = "kinesis_mock";
    }

    fn noop_spec(name: &str) -> PluginSpec {
        PluginSpec::from_constructor("svc", name, KinesisMock::default)
    }

    #[test]
    fn test_resolve_spec_is_identity() {
        let spec = noop_spec("a").metadata("k", 1);
        let resolved = PluginSpecResolver::new()
            .resolve(PluginSource::Spec(spec.clone()))
            .unwrap();

        assert!(resolved.same_factory(&spec));
        assert_eq!(resolved.id(), spec.id());
        assert_eq!(resolved.get_metadata(), spec.get_metadata());
    }

    #[test]
    fn test_resolve_type() {
        let resolved = PluginSpecResolver::new()
            .resolve(PluginSource::of_type::<KinesisMock>())
            .unwrap();

        assert_eq!(resolved.namespace(), "aws.providers.kinesis");
        assert_eq!(resolved.name(), "kinesis_mock");
        assert_eq!(resolved.get_factory_ref().object, "KinesisMock");

        let mut plugin = resolved.instantiate().unwrap();
        let value = plugin.load(&LoadArgs::default()).unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"kinesis"));
    }

    #[test]
    fn test_resolve_spec_factory() {
        let source = PluginSource::spec_fn(|| Ok(noop_spec("from-fn")));
        let resolved = PluginSpecResolver::new().resolve(source).unwrap();
        assert_eq!(resolved.id(), "svc:from-fn");
    }

    #[test]
    fn test_resolve_spec_factory_failure() {
        let source = PluginSource::spec_fn(|| Err("no spec today".into()));
        let err = PluginSpecResolver::new().resolve(source).unwrap_err();
        assert!(matches!(err, ResolutionError::SpecFactory { .. }));
        assert!(err.to_string().contains("no spec today"));

        let source = PluginSource::spec_fn(|| panic!("spec factory panicked"));
        let err = PluginSpecResolver::new().resolve(source).unwrap_err();
        assert!(err.to_string().contains("spec factory panicked"));
    }

    #[test]
    fn test_resolve_unrecognized() {
        let err = PluginSpecResolver::new()
            .resolve(PluginSource::Unrecognized("app::plugins:CONSTANT".into()))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Unrecognized { .. }));
        assert!(err.to_string().contains("app::plugins:CONSTANT"));
    }

    #[test]
    fn test_resolve_invalid_spec() {
        let err = PluginSpecResolver::new()
            .resolve(noop_spec("bad:name").into())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidSpec { .. }));

        let spec = PluginSpec::from_constructor("", "a", KinesisMock::default);
        let err = PluginSpecResolver::new().resolve(spec.into()).unwrap_err();
        assert!(err.to_string().contains("invalid namespace"));
    }

    #[test]
    fn test_resolve_keeps_free_form_names() {
        let spec = noop_spec("my plugin");
        let resolved = PluginSpecResolver::new()
            .resolve(spec.clone().into())
            .unwrap();
        assert_eq!(resolved.name(), "my plugin");
        assert!(resolved.same_factory(&spec));
    }

    #[test]
    fn test_describe() {
        let source = PluginSource::of_type::<KinesisMock>();
        assert!(source.describe().ends_with(":KinesisMock"));
        assert_eq!(
            PluginSource::Unrecognized("opaque".into()).describe(),
            "opaque"
        );
    }
}
