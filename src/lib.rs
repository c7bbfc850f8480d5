//! crucible: in-process compile-load-run orchestration
//!
//! Takes a component markup item (or raw intermediate source), compiles it
//! to a module image, loads the image into the process module space, and
//! resolves or invokes the conventional entry point, all inside the running
//! process with no file system or external toolchain.
//!
//! The pipeline is driven by [`CompileService`]:
//!
//! 1. References: fetch and decode images for the host modules, once per
//!    service, best-effort ([`references`]).
//! 2. Template: markup to intermediate source (the `template` crate).
//! 3. Language: parse then emit against the references (the `compiler`
//!    crate), producing module bytes.
//! 4. Load and invoke: bytes into the module registry, entry resolution by
//!    the `Run` convention, invocation (the `crucible-runtime` crate).
//!
//! Each request carries a [`CompileLog`] and reports the furthest [`Stage`]
//! it reached. Compile problems never escape as errors; the one exception
//! is a fault raised by the invoked entry method, which `compile_and_run`
//! returns as `Err`.

pub mod compile_log;
pub mod logging;
pub mod references;
pub mod service;
pub mod stage;

pub use compile_log::CompileLog;
pub use references::{
    FetchError, FetchOutcome, HttpReferenceSource, ReferenceCache, ReferenceSource,
    FRAMEWORK_SEGMENT,
};
pub use service::{
    CellLanguageCompiler, CompileService, LanguageCompiler, MarkupTemplateCompiler, ModuleLoader,
    ModuleOutcome, RunOutcome, StageOutput, TemplateCompiler, TemplateOutcome, TEMPLATE_ITEM_PATH,
};
pub use stage::Stage;

pub use compiler::{CompileOptions, LanguageVersion, ReferenceSet};
pub use crucible_runtime::{
    EntryPoint, InvokeError, LoadedModule, ModuleImage, ModuleRegistry, TypeHandle,
};
