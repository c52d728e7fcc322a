use std::collections::BTreeMap;

use crate::def::OptDef;

/// Set of option definitions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    defs: BTreeMap<String, OptDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with [`common_opts`](crate::common_opts).
    pub fn with_common() -> Self {
        let mut registry = Self::new();
        registry.register_opts(crate::common_opts());
        registry
    }

    /// Add a definition, replacing (and returning) any earlier one of the same name.
    pub fn define(&mut self, def: OptDef) -> Option<OptDef> {
        self.defs.insert(def.name.clone(), def)
    }

    pub fn register_opts(&mut self, defs: impl IntoIterator<Item = OptDef>) -> &mut Self {
        for def in defs {
            self.define(def);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptDef> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &OptDef> {
        self.defs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::OptKind;

    #[test]
    fn redefinition_replaces_earlier_definition() {
        let mut registry = Registry::new();
        assert!(registry.define(OptDef::str("listen", "127.0.0.1", "")).is_none());

        let previous = registry.define(OptDef::int("listen", 0, "")).unwrap();
        assert_eq!(previous.kind, OptKind::Str);
        assert_eq!(registry.get("listen").unwrap().kind, OptKind::Int);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn common_registry_has_builtin_options() {
        let registry = Registry::with_common();
        for name in ["debug", "verbose", "config", "sql_connection", "lock_path", "api_port"] {
            assert!(registry.contains(name), "{name} missing");
        }
        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
