//! Compile orchestration service
//!
//! Drives the full pipeline for one request at a time: ensure references,
//! compile markup to intermediate source (template requests only), parse and
//! emit that source, load the resulting module, resolve an entry type, and
//! for run requests invoke it.
//!
//! Every request gets its own [`CompileLog`] and reports the furthest
//! [`Stage`] it reached. Compile-side problems of any kind end the request
//! early with an absent value and the evidence in the log; the only failure
//! that surfaces as an `Err` is a fault raised by the invoked entry method
//! itself.

use std::sync::Arc;

use log::info;

use compiler::{CompileOptions, ReferenceSet, Unit};
use crucible_runtime::{
    InvokeError, LoadError, LoadedModule, ModuleRegistry, TypeHandle, ENTRY_METHOD,
};
use diagnostics::Diagnostics;
use template::{TemplateEngine, TemplateItem};

use crate::compile_log::CompileLog;
use crate::references::{ReferenceCache, ReferenceSource};
use crate::stage::Stage;

/// Logical path label under which template items are processed.
pub const TEMPLATE_ITEM_PATH: &str = "/app/view.tmpl";

/// Value-plus-diagnostics result of one pipeline phase. Any `Error`
/// severity among the diagnostics leaves the value absent.
#[derive(Debug)]
pub struct StageOutput<T> {
    pub value: Option<T>,
    pub diagnostics: Diagnostics,
}

/// Stage one: markup to intermediate source.
pub trait TemplateCompiler {
    fn compile(&self, source: &str, path: &str) -> StageOutput<String>;
}

/// Stage two: intermediate source to module bytes, in two phases.
pub trait LanguageCompiler {
    type Unit;

    fn parse(&self, source: &str) -> StageOutput<Self::Unit>;
    fn emit(&self, unit: Self::Unit, references: &ReferenceSet) -> StageOutput<Vec<u8>>;
}

/// Stage three: module bytes into the process module space.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Arc<LoadedModule>, LoadError>;

    /// Names of host modules, the candidates for reference collection.
    fn host_modules(&self) -> Vec<String>;
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, bytes: &[u8]) -> Result<Arc<LoadedModule>, LoadError> {
        ModuleRegistry::load(self, bytes)
    }

    fn host_modules(&self) -> Vec<String> {
        self.host_module_names()
    }
}

/// Default stage-one collaborator. A fresh engine is built per call.
#[derive(Debug, Default)]
pub struct MarkupTemplateCompiler;

impl TemplateCompiler for MarkupTemplateCompiler {
    fn compile(&self, source: &str, path: &str) -> StageOutput<String> {
        let engine = TemplateEngine::new();
        let processed = engine.process(&TemplateItem::new(path, source));
        StageOutput {
            value: processed.generated_code,
            diagnostics: processed.diagnostics,
        }
    }
}

/// Default stage-two collaborator.
#[derive(Debug, Default)]
pub struct CellLanguageCompiler {
    options: CompileOptions,
}

impl CellLanguageCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }
}

impl LanguageCompiler for CellLanguageCompiler {
    type Unit = Unit;

    fn parse(&self, source: &str) -> StageOutput<Unit> {
        let parsed = compiler::parse_unit(source, &self.options);
        StageOutput {
            value: parsed.unit,
            diagnostics: parsed.diagnostics,
        }
    }

    fn emit(&self, unit: Unit, references: &ReferenceSet) -> StageOutput<Vec<u8>> {
        let emitted = compiler::emit_unit(&unit, references, &self.options);
        StageOutput {
            value: emitted.bytes,
            diagnostics: emitted.diagnostics,
        }
    }
}

/// Outcome of a template request: the resolved component entry type.
#[derive(Debug)]
pub struct TemplateOutcome {
    pub entry: Option<TypeHandle>,
    pub stage: Stage,
    pub log: CompileLog,
}

/// Outcome of a raw-source request: the loaded module.
#[derive(Debug)]
pub struct ModuleOutcome {
    pub module: Option<Arc<LoadedModule>>,
    pub stage: Stage,
    pub log: CompileLog,
}

/// Outcome of a compile-and-run request.
///
/// `Ok(None)` means compilation or entry resolution failed and the log says
/// why; `Err` is reserved for faults raised by the invoked method itself.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: Result<Option<String>, InvokeError>,
    pub stage: Stage,
    pub log: CompileLog,
}

/// The orchestrator. One instance serves many requests; the reference set
/// is built on the first request and shared by all later ones.
pub struct CompileService<T = MarkupTemplateCompiler, L = CellLanguageCompiler> {
    template: T,
    language: L,
    loader: Arc<dyn ModuleLoader>,
    references: ReferenceCache,
}

impl CompileService {
    /// Build a service with the default markup and language collaborators.
    pub fn new(loader: Arc<dyn ModuleLoader>, source: Box<dyn ReferenceSource>) -> Self {
        Self::with_collaborators(
            MarkupTemplateCompiler,
            CellLanguageCompiler::default(),
            loader,
            source,
        )
    }
}

impl<T: TemplateCompiler, L: LanguageCompiler> CompileService<T, L> {
    pub fn with_collaborators(
        template: T,
        language: L,
        loader: Arc<dyn ModuleLoader>,
        source: Box<dyn ReferenceSource>,
    ) -> Self {
        Self {
            template,
            language,
            loader,
            references: ReferenceCache::new(source),
        }
    }

    fn ensure_references(&self, log: &mut CompileLog) -> Arc<ReferenceSet> {
        let candidates = self.loader.host_modules();
        let (set, _outcomes) = self.references.ensure(&candidates, log);
        set
    }

    /// Compile a markup item and resolve its component entry type.
    pub fn compile_template(&self, source: &str) -> TemplateOutcome {
        let mut log = CompileLog::start();
        let references = self.ensure_references(&mut log);
        let mut stage = Stage::ReferencesReady;

        log.append(format!("Process template item '{}'", TEMPLATE_ITEM_PATH));
        let processed = self.template.compile(source, TEMPLATE_ITEM_PATH);
        append_diagnostics(&mut log, &processed.diagnostics);
        let generated = match processed.value {
            Some(code) if !processed.diagnostics.has_errors() => code,
            _ => {
                return TemplateOutcome {
                    entry: None,
                    stage,
                    log,
                }
            }
        };
        log.append(generated.clone());
        stage = Stage::TemplateCompiled;

        let Some(module) = self.compile_source(&generated, &references, &mut log, &mut stage)
        else {
            return TemplateOutcome {
                entry: None,
                stage,
                log,
            };
        };

        // Component detection is transitive: the base chain may pass
        // through the module's own types and the reference set.
        let entry = module
            .exported_type_handles()
            .into_iter()
            .find(|handle| handle.is_component_via(|name| references.base_of(name)));
        match &entry {
            Some(handle) => {
                info!("component entry type resolved: {}", handle.name());
                log.append(format!("Component entry type found: {}", handle.name()));
                stage = Stage::EntryFound;
            }
            None => log.append("No component entry type found"),
        }
        TemplateOutcome { entry, stage, log }
    }

    /// Compile raw intermediate source and load the resulting module.
    pub fn compile_raw(&self, source: &str) -> ModuleOutcome {
        let mut log = CompileLog::start();
        let references = self.ensure_references(&mut log);
        let mut stage = Stage::ReferencesReady;
        let module = self.compile_source(source, &references, &mut log, &mut stage);
        ModuleOutcome { module, stage, log }
    }

    /// Compile raw intermediate source, resolve its entry, and invoke it.
    pub fn compile_and_run(&self, source: &str, name: &str, count: i64) -> RunOutcome {
        let mut log = CompileLog::start();
        let references = self.ensure_references(&mut log);
        let mut stage = Stage::ReferencesReady;

        let Some(module) = self.compile_source(source, &references, &mut log, &mut stage) else {
            return RunOutcome {
                result: Ok(None),
                stage,
                log,
            };
        };

        let Some(entry_type) = module.first_exported_type() else {
            log.append("No exported type found");
            return RunOutcome {
                result: Ok(None),
                stage,
                log,
            };
        };
        log.append(format!("Entry type found: {}", entry_type.name()));
        stage = Stage::EntryFound;

        let Some(entry) = entry_type.resolve_entry() else {
            log.append(format!(
                "Entry method '{}' not found on {}",
                ENTRY_METHOD,
                entry_type.name()
            ));
            return RunOutcome {
                result: Ok(None),
                stage,
                log,
            };
        };

        info!("invoking {}.{}", entry.type_name(), ENTRY_METHOD);
        log.append(format!("Invoke {}.{}", entry.type_name(), ENTRY_METHOD));
        stage = Stage::Invoked;
        match crucible_runtime::EntryPoint::run(&entry, name, count) {
            Ok(result) => RunOutcome {
                result: Ok(Some(result)),
                stage,
                log,
            },
            Err(fault) => {
                log.append(format!("Invocation fault: {}", fault));
                RunOutcome {
                    result: Err(fault),
                    stage,
                    log,
                }
            }
        }
    }

    /// Shared tail of every request: parse, emit, load.
    fn compile_source(
        &self,
        source: &str,
        references: &ReferenceSet,
        log: &mut CompileLog,
        stage: &mut Stage,
    ) -> Option<Arc<LoadedModule>> {
        log.append("Parse syntax tree");
        let parsed = self.language.parse(source);
        append_diagnostics(log, &parsed.diagnostics);
        let unit = match parsed.value {
            Some(unit) if !parsed.diagnostics.has_errors() => unit,
            _ => {
                log.append("Parse syntax tree error");
                return None;
            }
        };
        log.append("Parse syntax tree success");
        *stage = Stage::LanguageParsed;

        let emitted = self.language.emit(unit, references);
        append_diagnostics(log, &emitted.diagnostics);
        let bytes = match emitted.value {
            Some(bytes) if !emitted.diagnostics.has_errors() => bytes,
            _ => {
                log.append("Compilation error");
                return None;
            }
        };
        log.append("Compilation success");
        *stage = Stage::LanguageEmitted;

        match self.loader.load(&bytes) {
            Ok(module) => {
                log.append(format!("Module '{}' loaded", module.name()));
                *stage = Stage::ModuleLoaded;
                Some(module)
            }
            Err(e) => {
                log.append(format!("Module load failed: {}", e));
                None
            }
        }
    }
}

fn append_diagnostics(log: &mut CompileLog, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        log.append(diagnostic.to_string());
    }
}
