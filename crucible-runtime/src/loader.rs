//! Module registry, loading, and entry-point resolution
//!
//! The registry models the host process's module space. Host modules are
//! installed directly from images by the embedding shell; dynamic modules
//! are decoded from compiled bytes. Dynamic modules are excluded from
//! reference-candidate enumeration so a compiled unit never becomes a
//! reference for the next compilation.
//!
//! Once loaded, a module stays in the registry until the registry itself is
//! dropped. The original design has no unload path and this reproduction
//! keeps that documented leak.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use thiserror::Error;

use crate::eval::{evaluate, InvokeError, Value};
use crate::image::{ClassImage, ImageError, MethodImage, ModuleImage, TypeTag};
use crate::{COMPONENT_BASE, ENTRY_METHOD};

/// Capability exposed by every invocable compiled unit.
///
/// Compiled entry types satisfy this contract through their symbol table
/// instead of name-string reflection: resolution happens once, up front,
/// and the resulting instance is directly callable.
pub trait EntryPoint {
    fn run(&self, name: &str, count: i64) -> Result<String, InvokeError>;
}

/// How a module entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Installed by the hosting shell; visible to reference collection.
    Host,
    /// Produced by an in-process compilation; excluded from references.
    Dynamic,
}

/// A module resident in the process module space.
#[derive(Debug)]
pub struct LoadedModule {
    image: ModuleImage,
    origin: ModuleOrigin,
}

impl LoadedModule {
    pub fn name(&self) -> &str {
        &self.image.name
    }

    pub fn origin(&self) -> ModuleOrigin {
        self.origin
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    /// Exported types in declaration order.
    pub fn exported_types(&self) -> &[ClassImage] {
        &self.image.classes
    }

    /// First exported type satisfying the predicate, by declaration order.
    pub fn find_exported_type(
        self: &Arc<Self>,
        mut predicate: impl FnMut(&ClassImage) -> bool,
    ) -> Option<TypeHandle> {
        self.image
            .classes
            .iter()
            .position(|class| predicate(class))
            .map(|index| TypeHandle {
                module: Arc::clone(self),
                index,
            })
    }

    pub fn first_exported_type(self: &Arc<Self>) -> Option<TypeHandle> {
        self.find_exported_type(|_| true)
    }

    /// Handles to every exported type, in declaration order.
    pub fn exported_type_handles(self: &Arc<Self>) -> Vec<TypeHandle> {
        (0..self.image.classes.len())
            .map(|index| TypeHandle {
                module: Arc::clone(self),
                index,
            })
            .collect()
    }
}

/// Handle to one exported type of a loaded module.
#[derive(Debug, Clone)]
pub struct TypeHandle {
    module: Arc<LoadedModule>,
    index: usize,
}

impl TypeHandle {
    fn class(&self) -> &ClassImage {
        &self.module.image.classes[self.index]
    }

    pub fn name(&self) -> &str {
        &self.class().name
    }

    pub fn base(&self) -> Option<&str> {
        self.class().base.as_deref()
    }

    /// Whether this type's base chain reaches the component capability.
    ///
    /// The chain is followed through this module's own exported types. Types
    /// declared elsewhere are invisible here; use [`is_component_via`] with
    /// a resolver over the reference set to follow the chain across modules.
    ///
    /// [`is_component_via`]: TypeHandle::is_component_via
    pub fn is_component(&self) -> bool {
        self.is_component_via(|_| None)
    }

    /// Like [`is_component`], with `external_base` supplying the declared
    /// base of types this module does not export.
    ///
    /// [`is_component`]: TypeHandle::is_component
    pub fn is_component_via(&self, external_base: impl Fn(&str) -> Option<String>) -> bool {
        let mut seen: Vec<String> = Vec::new();
        let mut current = self.class().base.clone();
        while let Some(base) = current {
            if base == COMPONENT_BASE {
                return true;
            }
            // Cycle guard: a base chain that revisits a name never
            // reaches the capability.
            if seen.contains(&base) {
                return false;
            }
            let next = match self.module.image.exported_type(&base) {
                Some(local) => local.base.clone(),
                None => external_base(&base),
            };
            seen.push(base);
            current = next;
        }
        false
    }

    /// Resolve the conventional entry method from the symbol table.
    ///
    /// Returns `None` when no method named `Run` is exported; shape problems
    /// on a method that does exist surface later as invocation faults.
    pub fn resolve_entry(&self) -> Option<EntryInstance> {
        let method = self
            .class()
            .methods
            .iter()
            .position(|m| m.name == ENTRY_METHOD)?;
        Some(EntryInstance {
            module: Arc::clone(&self.module),
            class: self.index,
            method,
        })
    }
}

/// A resolved, directly invocable entry point.
#[derive(Debug, Clone)]
pub struct EntryInstance {
    module: Arc<LoadedModule>,
    class: usize,
    method: usize,
}

impl EntryInstance {
    fn method(&self) -> &MethodImage {
        &self.module.image.classes[self.class].methods[self.method]
    }

    pub fn type_name(&self) -> &str {
        &self.module.image.classes[self.class].name
    }
}

impl EntryPoint for EntryInstance {
    fn run(&self, name: &str, count: i64) -> Result<String, InvokeError> {
        let method = self.method();
        let expected = [TypeTag::Str, TypeTag::Int];
        if method.params.len() != expected.len() {
            return Err(InvokeError::ArityMismatch {
                method: method.name.clone(),
                expected: expected.len(),
                actual: method.params.len(),
            });
        }
        for (param, tag) in method.params.iter().zip(expected) {
            if param.ty != tag {
                return Err(InvokeError::ArgumentType {
                    name: param.name.clone(),
                });
            }
        }

        let args = [Value::Str(name.to_string()), Value::Int(count)];
        match evaluate(&method.body, &args)? {
            Value::Str(result) => Ok(result),
            Value::Int(_) => Err(InvokeError::ReturnType),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed module image: {0}")]
    Malformed(#[from] ImageError),
}

/// The process module space.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Mutex<Vec<Arc<LoadedModule>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a host module image supplied by the embedding shell.
    pub fn install_host(&self, image: ModuleImage) -> Arc<LoadedModule> {
        debug!("installing host module '{}'", image.name);
        let module = Arc::new(LoadedModule {
            image,
            origin: ModuleOrigin::Host,
        });
        self.modules.lock().push(Arc::clone(&module));
        module
    }

    /// Load compiled module bytes into the process.
    ///
    /// The module is retained for the registry's lifetime; there is no
    /// unload path.
    pub fn load(&self, bytes: &[u8]) -> Result<Arc<LoadedModule>, LoadError> {
        let image = ModuleImage::from_bytes(bytes)?;
        info!(
            "loaded module '{}' ({} exported types)",
            image.name,
            image.classes.len()
        );
        let module = Arc::new(LoadedModule {
            image,
            origin: ModuleOrigin::Dynamic,
        });
        self.modules.lock().push(Arc::clone(&module));
        Ok(module)
    }

    /// Names of host modules, the candidates for reference collection.
    pub fn host_module_names(&self) -> Vec<String> {
        self.modules
            .lock()
            .iter()
            .filter(|m| m.origin == ModuleOrigin::Host)
            .map(|m| m.image.name.clone())
            .collect()
    }

    pub fn module_count(&self) -> usize {
        self.modules.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{BinOp, Expr, ParamImage};

    fn greeter_image(module: &str, class_names: &[&str]) -> ModuleImage {
        let classes = class_names
            .iter()
            .map(|name| ClassImage {
                name: (*name).into(),
                base: None,
                methods: vec![MethodImage {
                    name: ENTRY_METHOD.into(),
                    params: vec![
                        ParamImage {
                            name: "name".into(),
                            ty: TypeTag::Str,
                        },
                        ParamImage {
                            name: "count".into(),
                            ty: TypeTag::Int,
                        },
                    ],
                    ret: TypeTag::Str,
                    body: Expr::Binary {
                        op: BinOp::Concat,
                        lhs: Box::new(Expr::Str(format!("{}:", name))),
                        rhs: Box::new(Expr::Param(0)),
                    },
                }],
            })
            .collect();
        ModuleImage {
            name: module.into(),
            classes,
        }
    }

    #[test]
    fn test_load_and_invoke() {
        let registry = ModuleRegistry::new();
        let bytes = greeter_image("demo", &["Greeter"]).to_bytes().unwrap();
        let module = registry.load(&bytes).unwrap();
        let entry = module
            .first_exported_type()
            .unwrap()
            .resolve_entry()
            .unwrap();
        assert_eq!(entry.run("sam", 3).unwrap(), "Greeter:sam");
    }

    #[test]
    fn test_first_exported_type_declaration_order() {
        let registry = ModuleRegistry::new();
        let bytes = greeter_image("demo", &["First", "Second"]).to_bytes().unwrap();
        let module = registry.load(&bytes).unwrap();
        assert_eq!(module.first_exported_type().unwrap().name(), "First");
    }

    #[test]
    fn test_host_names_exclude_dynamic() {
        let registry = ModuleRegistry::new();
        registry.install_host(greeter_image("framework", &["Component"]));
        let bytes = greeter_image("demo", &["Greeter"]).to_bytes().unwrap();
        registry.load(&bytes).unwrap();

        assert_eq!(registry.host_module_names(), vec!["framework".to_string()]);
        assert_eq!(registry.module_count(), 2);
    }

    #[test]
    fn test_missing_run_method() {
        let registry = ModuleRegistry::new();
        let image = ModuleImage {
            name: "demo".into(),
            classes: vec![ClassImage {
                name: "Silent".into(),
                base: None,
                methods: vec![],
            }],
        };
        let module = registry.load(&image.to_bytes().unwrap()).unwrap();
        let handle = module.first_exported_type().unwrap();
        assert!(handle.resolve_entry().is_none());
    }

    fn plain_class(name: &str, base: Option<&str>) -> ClassImage {
        ClassImage {
            name: name.into(),
            base: base.map(Into::into),
            methods: vec![],
        }
    }

    #[test]
    fn test_component_chain_within_module() {
        let registry = ModuleRegistry::new();
        let module = registry.install_host(ModuleImage {
            name: "framework".into(),
            classes: vec![
                plain_class("Component", None),
                plain_class("Base", Some("Component")),
                plain_class("View", Some("Base")),
                plain_class("Detached", Some("Nowhere")),
            ],
        });
        let handles = module.exported_type_handles();
        assert!(handles[1].is_component());
        assert!(handles[2].is_component());
        assert!(!handles[3].is_component());
    }

    #[test]
    fn test_component_chain_via_external_resolver() {
        let registry = ModuleRegistry::new();
        let image = ModuleImage {
            name: "demo".into(),
            classes: vec![plain_class("View", Some("Base"))],
        };
        let module = registry.load(&image.to_bytes().unwrap()).unwrap();
        let handle = module.first_exported_type().unwrap();

        // The module itself does not export Base.
        assert!(!handle.is_component());
        assert!(handle.is_component_via(|name| match name {
            "Base" => Some("Component".to_string()),
            _ => None,
        }));
    }

    #[test]
    fn test_component_chain_cycle_terminates() {
        let registry = ModuleRegistry::new();
        let module = registry.install_host(ModuleImage {
            name: "demo".into(),
            classes: vec![
                plain_class("A", Some("B")),
                plain_class("B", Some("A")),
            ],
        });
        let handles = module.exported_type_handles();
        assert!(!handles[0].is_component());
    }

    #[test]
    fn test_malformed_bytes() {
        let registry = ModuleRegistry::new();
        assert!(registry.load(&[1, 2, 3]).is_err());
        assert_eq!(registry.module_count(), 0);
    }

    #[test]
    fn test_wrong_shape_is_invocation_fault() {
        let registry = ModuleRegistry::new();
        let image = ModuleImage {
            name: "demo".into(),
            classes: vec![ClassImage {
                name: "OneArg".into(),
                base: None,
                methods: vec![MethodImage {
                    name: ENTRY_METHOD.into(),
                    params: vec![ParamImage {
                        name: "name".into(),
                        ty: TypeTag::Str,
                    }],
                    ret: TypeTag::Str,
                    body: Expr::Param(0),
                }],
            }],
        };
        let module = registry.load(&image.to_bytes().unwrap()).unwrap();
        let entry = module
            .first_exported_type()
            .unwrap()
            .resolve_entry()
            .unwrap();
        assert!(matches!(
            entry.run("sam", 1),
            Err(InvokeError::ArityMismatch { .. })
        ));
    }
}
