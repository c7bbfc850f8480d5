//! Per-request compile log
//!
//! An append-only, ordered record of what happened during one orchestration
//! request. A log is created by [`CompileLog::start`] when a request begins
//! and travels with that request only; it is handed back to the caller
//! inside the outcome and never shared between requests.

use log::debug;

#[derive(Debug, Default)]
pub struct CompileLog {
    entries: Vec<String>,
}

impl CompileLog {
    /// Begin a fresh log for one request.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!("log: {}", entry);
        self.entries.push(entry);
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Whether any entry contains the given fragment.
    pub fn contains(&self, fragment: &str) -> bool {
        self.entries.iter().any(|e| e.contains(fragment))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the log, yielding its entries for display.
    pub fn drain(self) -> Vec<String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut log = CompileLog::start();
        log.append("first");
        log.append(String::from("second"));
        assert_eq!(log.entries(), ["first", "second"]);
        assert_eq!(log.last(), Some("second"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_contains_matches_fragments() {
        let mut log = CompileLog::start();
        log.append("Compilation success");
        assert!(log.contains("success"));
        assert!(!log.contains("error"));
    }

    #[test]
    fn test_drain_returns_everything() {
        let mut log = CompileLog::start();
        log.append("a");
        log.append("b");
        assert_eq!(log.drain(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fresh_log_is_empty() {
        assert!(CompileLog::start().is_empty());
    }
}
