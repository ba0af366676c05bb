use std::collections::HashMap;

use tracing::debug;
use xesload_core::error::Result;
use xesload_core::model::{AttributeType, Extension};
use xesload_core::store::RowStore;

/// Deduplicating cache of attribute definitions and extensions for one import.
///
/// Attribute definitions are keyed by `(key, type)` and extensions by prefix. The
/// first sighting writes the row; later sightings return the cached id.
#[derive(Debug, Default)]
pub struct Registry {
    attributes: HashMap<String, HashMap<AttributeType, i64>>,
    extensions: HashMap<String, i64>,
    attribute_count: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_attribute<S: RowStore + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
        kind: AttributeType,
    ) -> Result<i64> {
        if let Some(id) = self.attributes.get(key).and_then(|kinds| kinds.get(&kind)) {
            return Ok(*id);
        }

        let ext_id = key
            .split_once(':')
            .and_then(|(prefix, _)| self.resolve_extension(prefix));
        let id = store.insert_attribute(key, kind, ext_id)?;
        self.attributes
            .entry(key.to_string())
            .or_default()
            .insert(kind, id);
        self.attribute_count += 1;
        debug!(key, kind = %kind, id, "created attribute definition");
        Ok(id)
    }

    /// Returns the id for the extension's prefix, writing the extension first if
    /// the prefix has not been seen. Absent prefixes share one entry.
    pub fn register_extension<S: RowStore + ?Sized>(
        &mut self,
        store: &mut S,
        extension: &Extension,
    ) -> Result<i64> {
        let prefix = extension.prefix.clone().unwrap_or_default();
        if let Some(id) = self.extensions.get(&prefix) {
            return Ok(*id);
        }

        let id = store.insert_extension(extension)?;
        debug!(prefix = %prefix, name = ?extension.name, id, "created extension");
        self.extensions.insert(prefix, id);
        Ok(id)
    }

    pub fn resolve_extension(&self, prefix: &str) -> Option<i64> {
        if prefix.is_empty() {
            return None;
        }
        self.extensions.get(prefix).copied()
    }

    pub fn attribute_count(&self) -> u64 {
        self.attribute_count
    }

    pub fn extension_count(&self) -> u64 {
        self.extensions.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use testkit::FakeStore;

    use super::*;

    #[test]
    fn same_key_and_type_resolves_to_one_definition() {
        let mut store = FakeStore::new();
        let mut registry = Registry::new();

        let a = registry
            .resolve_attribute(&mut store, "concept:name", AttributeType::String)
            .unwrap();
        let b = registry
            .resolve_attribute(&mut store, "concept:name", AttributeType::String)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.attributes.len(), 1);
        assert_eq!(registry.attribute_count(), 1);
    }

    #[test]
    fn type_is_part_of_the_identity() {
        let mut store = FakeStore::new();
        let mut registry = Registry::new();

        let s = registry
            .resolve_attribute(&mut store, "cost", AttributeType::String)
            .unwrap();
        let i = registry
            .resolve_attribute(&mut store, "cost", AttributeType::Int)
            .unwrap();
        assert_ne!(s, i);
        assert_eq!(store.attributes.len(), 2);
    }

    #[test]
    fn extensions_deduplicate_by_prefix() {
        let mut store = FakeStore::new();
        let mut registry = Registry::new();
        let concept = Extension {
            name: Some("Concept".into()),
            prefix: Some("concept".into()),
            uri: Some("http://www.xes-standard.org/concept.xesext".into()),
        };
        let renamed = Extension {
            name: Some("Concept v2".into()),
            ..concept.clone()
        };

        let first = registry.register_extension(&mut store, &concept).unwrap();
        let second = registry.register_extension(&mut store, &renamed).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.extensions.len(), 1);
        assert_eq!(registry.resolve_extension("concept"), Some(first));
        assert_eq!(registry.resolve_extension("time"), None);
        assert_eq!(registry.resolve_extension(""), None);
    }

    #[test]
    fn attributes_link_to_declared_extension() {
        let mut store = FakeStore::new();
        let mut registry = Registry::new();
        let ext_id = registry
            .register_extension(
                &mut store,
                &Extension {
                    name: Some("Time".into()),
                    prefix: Some("time".into()),
                    uri: None,
                },
            )
            .unwrap();

        registry
            .resolve_attribute(&mut store, "time:timestamp", AttributeType::Date)
            .unwrap();
        registry
            .resolve_attribute(&mut store, "org:resource", AttributeType::String)
            .unwrap();
        registry
            .resolve_attribute(&mut store, "cost", AttributeType::Float)
            .unwrap();

        let links: Vec<Option<i64>> = store.attributes.iter().map(|a| a.3).collect();
        assert_eq!(links, vec![Some(ext_id), None, None]);
    }
}
