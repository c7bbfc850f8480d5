//! Crucible Runtime Library
//!
//! Provides the loadable module format and the in-process execution support
//! for compiled crucible units.
//!
//! # Architecture
//!
//! - **Module images** are postcard-serialized symbol tables: exported
//!   classes, their methods, and the method bodies as evaluable expression
//!   trees. The language compiler emits them, the loader decodes them.
//! - **The module registry** is the process's module space. Host modules are
//!   installed by the embedding shell and are visible to reference
//!   collection; dynamic modules come from compiled bytes. Loaded modules
//!   are retained until the registry is dropped; there is no unload.
//! - **Entry points** are resolved through the image's symbol table rather
//!   than by runtime reflection: a type handle locates the conventional
//!   `Run` method and exposes it through the [`EntryPoint`] capability.

pub mod eval;
pub mod image;
pub mod loader;

pub use eval::{evaluate, InvokeError, Value};
pub use image::{BinOp, ClassImage, Expr, ImageError, MethodImage, ModuleImage, ParamImage, TypeTag};
pub use loader::{EntryInstance, EntryPoint, LoadError, LoadedModule, ModuleOrigin, ModuleRegistry, TypeHandle};

/// Conventional name of the entry method on a compiled unit.
pub const ENTRY_METHOD: &str = "Run";

/// Name of the base capability that marks a type as a renderable component.
pub const COMPONENT_BASE: &str = "Component";

/// File extension used for fetchable reference module images.
pub const MODULE_EXTENSION: &str = "cell";
