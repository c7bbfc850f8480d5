//! Intermediate-language compiler
//!
//! Stage two of the crucible pipeline, split into the two phases the
//! orchestrator drives separately:
//!
//! 1. **Syntactic** — [`parse::parse_source`] turns source text into a
//!    [`ast::Unit`], reporting parse problems as diagnostics.
//! 2. **Semantic/emit** — [`emit::emit_unit`] resolves identifiers and base
//!    types against a [`references::ReferenceSet`], types every expression,
//!    and serializes the module image to bytes for the loader.
//!
//! Each phase returns its value alongside ordered diagnostics; an
//! `Error`-severity diagnostic leaves the value absent and the caller is
//! expected not to run the next phase.

pub mod ast;
pub mod emit;
pub mod parse;
pub mod references;

pub use ast::Unit;
pub use emit::{emit_unit, EmitOutput};
pub use parse::{parse_source, UnitParse};
pub use references::ReferenceSet;

use log::debug;

/// Grammar revision accepted by the syntactic phase.
///
/// There is a single published revision so far; `V1` and `Latest` share one
/// grammar. The variant exists so callers state a policy rather than
/// implicitly tracking whatever the parser currently does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageVersion {
    V1,
    #[default]
    Latest,
}

/// Options for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name stamped on the emitted module image.
    pub module_name: String,
    pub version: LanguageVersion,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: "crucible.Demo".to_string(),
            version: LanguageVersion::Latest,
        }
    }
}

/// Run the syntactic phase under the given options.
pub fn parse_unit(source: &str, options: &CompileOptions) -> UnitParse {
    debug!("parsing unit under {:?} grammar", options.version);
    parse::parse_source(source)
}
