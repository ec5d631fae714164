//! Immutable plugin descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{BoxError, catch};
use super::namespace::{self, REFERENCE_SEP};
use super::plugin::{Plugin, PluginClass};

/// Zero-argument constructor producing one plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Result<Box<dyn Plugin>, BoxError> + Send + Sync>;

/// Stable textual reference to the code that defines a factory, rendered as `module:object`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactoryRef {
    pub module: String,
    pub object: String,
}

impl FactoryRef {
    pub fn new(module: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            object: object.into(),
        }
    }

    /// Derives the reference from a Rust type path, e.g. `my_crate::svc::S3Plugin`
    /// becomes `my_crate::svc:S3Plugin`.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    pub fn from_type_name(type_name: &str) -> Self {
        // Generic arguments may contain `::` themselves; only split the outer path.
        let path_end = type_name.find('<').unwrap_or(type_name.len());
        let (path, generics) = type_name.split_at(path_end);
        match path.rsplit_once("::") {
            Some((module, object)) => Self::new(module, format!("{}{}", object, generics)),
            None => Self::new("", type_name),
        }
    }

    /// Parses `module:object`, splitting at the last single `:` that is not part of `::`.
    pub fn parse(value: &str) -> Option<Self> {
        let bytes = value.as_bytes();
        let idx = (0..bytes.len()).rev().find(|&i| {
            bytes[i] == REFERENCE_SEP as u8
                && (i == 0 || bytes[i - 1] != b':')
                && bytes.get(i + 1) != Some(&b':')
        })?;
        let (module, object) = (&value[..idx], &value[idx + 1..]);
        if module.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self::new(module, object))
    }
}

impl fmt::Display for FactoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.module, REFERENCE_SEP, self.object)
    }
}

/// Descriptor identifying a plugin by `(namespace, name)` and how to construct it.
///
/// Cloning is cheap and clones share the same factory.
#[derive(Clone)]
pub struct PluginSpec {
    namespace: String,
    name: String,
    factory: PluginFactory,
    factory_ref: FactoryRef,
    metadata: Map<String, Value>,
    requirements: Vec<String>,
}

impl PluginSpec {
    pub fn new<F>(namespace: impl Into<String>, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Plugin>, BoxError> + Send + Sync + 'static,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            factory_ref: FactoryRef::of::<F>(),
            factory: Arc::new(factory),
            metadata: Map::new(),
            requirements: Vec::new(),
        }
    }

    /// Builds a spec from an infallible constructor.
    pub fn from_constructor<P, F>(
        namespace: impl Into<String>,
        name: impl Into<String>,
        constructor: F,
    ) -> Self
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let factory_ref = FactoryRef::of::<F>();
        Self::new(namespace, name, move || {
            Ok(Box::new(constructor()) as Box<dyn Plugin>)
        })
        .factory_ref(factory_ref)
    }

    /// Wraps a [`PluginClass`] type; its factory is the type's `Default`.
    pub fn of_class<T: PluginClass>() -> Self {
        Self::new(T::NAMESPACE, T::NAME, || {
            Ok(Box::new(T::default()) as Box<dyn Plugin>)
        })
        .factory_ref(FactoryRef::of::<T>())
        .requirements(T::requirements())
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn requirement(mut self, tag: impl Into<String>) -> Self {
        self.requirements.push(tag.into());
        self
    }

    pub fn requirements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Overrides the reference derived from the factory type.
    pub fn factory_ref(mut self, factory_ref: FactoryRef) -> Self {
        self.factory_ref = factory_ref;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `namespace:name`
    pub fn id(&self) -> String {
        namespace::qualified(&self.namespace, &self.name)
    }

    pub fn get_factory_ref(&self) -> &FactoryRef {
        &self.factory_ref
    }

    pub fn get_metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn get_requirements(&self) -> &[String] {
        &self.requirements
    }

    /// Returns true if both specs share the same factory.
    pub fn same_factory(&self, other: &PluginSpec) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }

    /// Invokes the factory. Panics inside the factory are returned as errors.
    pub fn instantiate(&self) -> Result<Box<dyn Plugin>, BoxError> {
        catch(|| (self.factory)())
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSpec")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("factory", &self.factory_ref.to_string())
            .field("metadata", &self.metadata)
            .field("requirements", &self.requirements)
            .finish()
    }
}

impl fmt::Display for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
