//! Discovery collaborators: enumerate raw plugin sources for a namespace.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::collector::{EntryPointMap, spec_to_entry_point};
use super::error::DiscoveryError;
use super::resolver::PluginSource;
use super::spec::{FactoryRef, PluginSpec};

/// A named reference to a loadable object inside a group (namespace).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub group: String,
    pub name: String,
    /// `module:object` reference.
    pub value: String,
}

impl EntryPoint {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses a `name=value` line belonging to `group`.
    pub fn parse(group: &str, line: &str) -> Result<Self, DiscoveryError> {
        let (name, value) =
            line.split_once('=')
                .ok_or_else(|| DiscoveryError::InvalidReference {
                    value: line.to_string(),
                    reason: "expected 'name=module:object'".into(),
                })?;
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            return Err(DiscoveryError::InvalidReference {
                value: line.to_string(),
                reason: "empty name or reference".into(),
            });
        }
        Ok(Self::new(group, name, value))
    }

    pub fn reference(&self) -> Option<FactoryRef> {
        FactoryRef::parse(&self.value)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug)]
pub struct DiscoveredSource {
    pub entry: EntryPoint,
    pub source: PluginSource,
}

/// A source that could not be loaded by the discovery layer itself.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub namespace: String,
    pub entry: EntryPoint,
    pub error: DiscoveryError,
}

#[derive(Debug, Default)]
pub struct Discovered {
    pub sources: Vec<DiscoveredSource>,
    pub failures: Vec<DiscoveryFailure>,
}

impl Discovered {
    pub fn len(&self) -> usize {
        self.sources.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.failures.is_empty()
    }
}

/// Enumerates raw plugin sources for a namespace.
///
/// Failures of individual entries are reported through [`Discovered::failures`];
/// an `Err` means the collaborator as a whole could not be reached.
pub trait PluginFinder: Send + Sync {
    fn find_plugins(&self, namespace: &str) -> Result<Discovered, DiscoveryError>;
}

/// Ordered, in-process list of plugin sources keyed by namespace.
#[derive(Debug, Clone, Default)]
pub struct StaticFinder {
    entries: Vec<(EntryPoint, PluginSource)>,
}

impl StaticFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        source: PluginSource,
    ) -> Self {
        let entry = EntryPoint::new(namespace, name, source.describe());
        self.entries.push((entry, source));
        self
    }

    /// Adds a spec under its own namespace and name.
    pub fn spec(self, spec: PluginSpec) -> Self {
        let (namespace, name) = (spec.namespace().to_string(), spec.name().to_string());
        self.source(namespace, name, PluginSource::Spec(spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PluginFinder for StaticFinder {
    fn find_plugins(&self, namespace: &str) -> Result<Discovered, DiscoveryError> {
        let sources = self
            .entries
            .iter()
            .filter(|(entry, _)| entry.group == namespace)
            .map(|(entry, source)| DiscoveredSource {
                entry: entry.clone(),
                source: source.clone(),
            })
            .collect();
        Ok(Discovered {
            sources,
            failures: Vec::new(),
        })
    }
}

/// In-process registry of declared entry points and the objects they reference.
///
/// Objects are provided under their `module:object` reference; entry points
/// are declared separately (directly, from an [`EntryPointMap`], or from a JSON
/// file). A declared entry point whose reference is not provided becomes a
/// discovery failure.
#[derive(Debug, Default)]
pub struct EntryPointRegistry {
    catalog: HashMap<String, PluginSource>,
    declared: Vec<(EntryPoint, Option<PluginSource>)>,
}

impl EntryPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `source` loadable under `reference`.
    pub fn provide(&mut self, reference: impl Into<String>, source: PluginSource) -> &mut Self {
        self.catalog.insert(reference.into(), source);
        self
    }

    pub fn declare(&mut self, entry: EntryPoint) -> &mut Self {
        self.declared.push((entry, None));
        self
    }

    /// Declares every line of `map`. Nothing is declared if any line is malformed.
    pub fn declare_map(&mut self, map: &EntryPointMap) -> Result<&mut Self, DiscoveryError> {
        let mut entries = Vec::new();
        for (group, lines) in map {
            for line in lines {
                entries.push((EntryPoint::parse(group, line)?, None));
            }
        }
        self.declared.extend(entries);
        Ok(self)
    }

    /// Declares every entry point of a JSON [`EntryPointMap`] file.
    pub fn declare_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, DiscoveryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let map: EntryPointMap = serde_json::from_str(&content)?;
        self.declare_map(&map)
    }

    /// Declares a spec together with its source, so it never needs a catalog lookup.
    pub fn register(&mut self, spec: PluginSpec) -> &mut Self {
        let entry = spec_to_entry_point(&spec);
        self.declared.push((entry, Some(PluginSource::Spec(spec))));
        self
    }

    pub fn declared(&self) -> impl Iterator<Item = &EntryPoint> {
        self.declared.iter().map(|(entry, _)| entry)
    }

    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.declared().map(|e| e.group.as_str()).collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    fn lookup(&self, entry: &EntryPoint) -> Result<PluginSource, DiscoveryError> {
        if entry.reference().is_none() {
            return Err(DiscoveryError::InvalidReference {
                value: entry.value.clone(),
                reason: "expected 'module:object'".into(),
            });
        }
        self.catalog
            .get(&entry.value)
            .cloned()
            .ok_or_else(|| DiscoveryError::UnknownReference {
                group: entry.group.clone(),
                entry: entry.name.clone(),
                value: entry.value.clone(),
            })
    }
}

impl PluginFinder for EntryPointRegistry {
    fn find_plugins(&self, namespace: &str) -> Result<Discovered, DiscoveryError> {
        let mut discovered = Discovered::default();

        for (entry, attached) in self.declared.iter().filter(|(e, _)| e.group == namespace) {
            let source = match attached {
                Some(source) => Ok(source.clone()),
                None => self.lookup(entry),
            };
            match source {
                Ok(source) => discovered.sources.push(DiscoveredSource {
                    entry: entry.clone(),
                    source,
                }),
                Err(error) => discovered.failures.push(DiscoveryFailure {
                    namespace: namespace.to_string(),
                    entry: entry.clone(),
                    error,
                }),
            }
        }

        Ok(discovered)
    }
}
