//! Component markup to intermediate source compiler
//!
//! Stage one of the crucible pipeline: parse a single in-memory markup item
//! and generate the intermediate-language source for one component class.
//! There is no file-system state; a [`TemplateItem`] is the whole project.
//!
//! A [`TemplateEngine`] is cheap and is meant to be constructed fresh per
//! processing call by the orchestrator.

use log::debug;

pub mod ast;
pub mod codegen;
pub mod parse;

pub use ast::{Attribute, Node};
pub use codegen::generate_component;
pub use parse::{parse_markup, MarkupParse};

use diagnostics::Diagnostics;

/// A single in-memory markup item with its logical path label.
#[derive(Debug, Clone)]
pub struct TemplateItem {
    pub path: String,
    pub source: String,
}

impl TemplateItem {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Output of processing one template item.
#[derive(Debug)]
pub struct ProcessedTemplate {
    /// Generated intermediate source, absent when parsing failed.
    pub generated_code: Option<String>,
    pub diagnostics: Diagnostics,
}

/// Processing engine for markup items.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    class_name: String,
    component_base: String,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self {
            class_name: "TemplateView".to_string(),
            component_base: "Component".to_string(),
        }
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = name.into();
        self
    }

    pub fn with_component_base(mut self, base: impl Into<String>) -> Self {
        self.component_base = base.into();
        self
    }

    /// Parse the item and generate intermediate source for it.
    ///
    /// Diagnostics are returned in emission order; any `Error` severity
    /// leaves `generated_code` absent.
    pub fn process(&self, item: &TemplateItem) -> ProcessedTemplate {
        debug!("processing template item '{}'", item.path);
        let parsed = parse_markup(&item.source);
        let generated_code = match &parsed.nodes {
            Some(nodes) if !parsed.diagnostics.has_errors() => Some(generate_component(
                nodes,
                &self.class_name,
                &self.component_base,
            )),
            _ => None,
        };
        ProcessedTemplate {
            generated_code,
            diagnostics: parsed.diagnostics,
        }
    }
}
