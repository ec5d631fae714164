pub const NAMESPACE_SEP: char = ':';

/// Separator between module path and object in a factory reference (`module:object`).
pub const REFERENCE_SEP: char = ':';

pub fn qualified(namespace: &str, name: &str) -> String {
    format!("{}{}{}", namespace, NAMESPACE_SEP, name)
}

/// Splits `namespace:name`. Namespaces may contain dots but never the separator,
/// so the split happens at the last separator.
pub fn parse(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once(NAMESPACE_SEP)
        .filter(|(ns, name)| !ns.is_empty() && !name.is_empty())
}

/// A name must be non-empty and free of the separator so that `qualified`
/// and `parse` round-trip.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(NAMESPACE_SEP)
}

pub fn is_valid_namespace(namespace: &str) -> bool {
    is_valid_name(namespace)
}
