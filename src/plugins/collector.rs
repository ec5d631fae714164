//! Export of resolved plugin specs as entry-point declarations for packaging tools.

use std::collections::BTreeMap;

use super::discovery::EntryPoint;
use super::spec::PluginSpec;

/// Entry points grouped by namespace; values are `name=module:object` lines.
pub type EntryPointMap = BTreeMap<String, Vec<String>>;

pub fn spec_to_entry_point(spec: &PluginSpec) -> EntryPoint {
    EntryPoint::new(
        spec.namespace(),
        spec.name(),
        spec.get_factory_ref().to_string(),
    )
}

pub fn to_entry_point_map<I>(entry_points: I) -> EntryPointMap
where
    I: IntoIterator<Item = EntryPoint>,
{
    let mut map = EntryPointMap::new();
    for ep in entry_points {
        map.entry(ep.group.clone()).or_default().push(ep.to_string());
    }
    map
}

/// Source of plugin specs to publish for discovery.
pub trait PluginCollector {
    fn collect_plugins(&self) -> Vec<PluginSpec>;

    fn entry_points(&self) -> EntryPointMap {
        to_entry_point_map(self.collect_plugins().iter().map(spec_to_entry_point))
    }
}

impl PluginCollector for [PluginSpec] {
    fn collect_plugins(&self) -> Vec<PluginSpec> {
        self.to_vec()
    }
}

impl PluginCollector for Vec<PluginSpec> {
    fn collect_plugins(&self) -> Vec<PluginSpec> {
        self.clone()
    }
}
