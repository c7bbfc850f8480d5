//! Pipeline stage tracking
//!
//! Each orchestration request reports the furthest stage it reached. Stages
//! advance strictly in declaration order and never move backwards within a
//! request; an aborted request simply stops at the last stage it completed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing has happened yet.
    Idle,
    /// The reference set exists (built now or on an earlier request).
    ReferencesReady,
    /// Markup was turned into intermediate source.
    TemplateCompiled,
    /// Intermediate source parsed into a syntax tree.
    LanguageParsed,
    /// The syntax tree was checked and serialized to module bytes.
    LanguageEmitted,
    /// Module bytes entered the process module space.
    ModuleLoaded,
    /// An entry type (and for runs, its entry method) was resolved.
    EntryFound,
    /// The entry method was called.
    Invoked,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ReferencesReady => "references-ready",
            Stage::TemplateCompiled => "template-compiled",
            Stage::LanguageParsed => "language-parsed",
            Stage::LanguageEmitted => "language-emitted",
            Stage::ModuleLoaded => "module-loaded",
            Stage::EntryFound => "entry-found",
            Stage::Invoked => "invoked",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Idle < Stage::ReferencesReady);
        assert!(Stage::LanguageParsed < Stage::LanguageEmitted);
        assert!(Stage::EntryFound < Stage::Invoked);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Stage::ModuleLoaded.to_string(), "module-loaded");
        assert_eq!(Stage::Invoked.to_string(), "invoked");
    }
}
