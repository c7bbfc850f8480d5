//! Reference set for external symbol resolution
//!
//! The modules the emit phase resolves base types against. Insertion order
//! is preserved so callers can observe the set in candidate order.

use indexmap::IndexMap;

use crucible_runtime::ModuleImage;

#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    modules: IndexMap<String, ModuleImage>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference module, keyed by its image name.
    pub fn insert(&mut self, image: ModuleImage) {
        self.modules.insert(image.name.clone(), image);
    }

    pub fn contains_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Whether any reference module exports the named type.
    pub fn exports_type(&self, name: &str) -> bool {
        self.modules.values().any(|m| m.exports_type(name))
    }

    /// Declared base of the named exported type, searched across modules.
    ///
    /// `None` both for an unknown type and for a type without a base, which
    /// is all a base-chain walk needs to stop.
    pub fn base_of(&self, type_name: &str) -> Option<String> {
        self.modules
            .values()
            .find_map(|m| m.exported_type(type_name))
            .and_then(|c| c.base.clone())
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_runtime::ClassImage;

    fn module(name: &str, types: &[&str]) -> ModuleImage {
        ModuleImage {
            name: name.into(),
            classes: types
                .iter()
                .map(|t| ClassImage {
                    name: (*t).into(),
                    base: None,
                    methods: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_exports_type_across_modules() {
        let mut set = ReferenceSet::new();
        set.insert(module("framework", &["Component"]));
        set.insert(module("widgets", &["Button", "Label"]));

        assert!(set.exports_type("Component"));
        assert!(set.exports_type("Label"));
        assert!(!set.exports_type("Missing"));
        assert!(set.contains_module("widgets"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut set = ReferenceSet::new();
        set.insert(module("b", &[]));
        set.insert(module("a", &[]));
        let names: Vec<_> = set.module_names().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_base_of_searches_all_modules() {
        let mut set = ReferenceSet::new();
        set.insert(module("framework", &["Component"]));
        set.insert(ModuleImage {
            name: "widgets".into(),
            classes: vec![ClassImage {
                name: "Base".into(),
                base: Some("Component".into()),
                methods: vec![],
            }],
        });

        assert_eq!(set.base_of("Base").as_deref(), Some("Component"));
        assert_eq!(set.base_of("Component"), None);
        assert_eq!(set.base_of("Missing"), None);
    }
}
