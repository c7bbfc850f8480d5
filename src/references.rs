//! Reference collection
//!
//! Builds the [`ReferenceSet`] the emit phase resolves against, at most once
//! per service. Candidates are the host modules of the process; each one is
//! fetched from the reference source and decoded. Collection is best-effort:
//! a candidate that fails to fetch or decode is skipped with a recorded
//! reason and never poisons the set or fails the request.

use std::io::Read;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use compiler::ReferenceSet;
use crucible_runtime::{ModuleImage, MODULE_EXTENSION};

use crate::compile_log::CompileLog;

/// Path segment reference images are served under.
pub const FRAMEWORK_SEGMENT: &str = "_framework";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),
}

/// Supplier of serialized reference images, one per candidate module.
pub trait ReferenceSource: Send + Sync {
    fn fetch(&self, module_name: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches reference images over HTTP from
/// `{base}/_framework/{module}.cell`.
pub struct HttpReferenceSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpReferenceSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }

    fn module_url(&self, module_name: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            self.base_url, FRAMEWORK_SEGMENT, module_name, MODULE_EXTENSION
        )
    }
}

impl ReferenceSource for HttpReferenceSource {
    fn fetch(&self, module_name: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.module_url(module_name);
        debug!("fetching reference image {}", url);
        let response = self.agent.get(&url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            other => FetchError::Transport(other.to_string()),
        })?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// What happened to one candidate during collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched { module: String },
    Skipped { module: String, reason: String },
}

/// Build-once cache over a reference source.
///
/// The gate serializes concurrent first calls so collection runs exactly
/// once; after the set exists the gate is held only long enough to clone
/// the handle, and no further fetches ever happen.
pub struct ReferenceCache {
    source: Box<dyn ReferenceSource>,
    set: Mutex<Option<Arc<ReferenceSet>>>,
}

impl ReferenceCache {
    pub fn new(source: Box<dyn ReferenceSource>) -> Self {
        Self {
            source,
            set: Mutex::new(None),
        }
    }

    pub fn is_built(&self) -> bool {
        self.set.lock().is_some()
    }

    /// Return the reference set, building it from `candidates` on the first
    /// call. Subsequent calls perform zero fetches and report no outcomes.
    pub fn ensure(
        &self,
        candidates: &[String],
        log: &mut CompileLog,
    ) -> (Arc<ReferenceSet>, Vec<FetchOutcome>) {
        let mut guard = self.set.lock();
        if let Some(set) = guard.as_ref() {
            log.append(format!("References ready ({} modules)", set.len()));
            return (Arc::clone(set), Vec::new());
        }

        let mut set = ReferenceSet::new();
        let mut outcomes = Vec::with_capacity(candidates.len());
        for module in candidates {
            let decoded = self
                .source
                .fetch(module)
                .map_err(|e| e.to_string())
                .and_then(|bytes| ModuleImage::from_bytes(&bytes).map_err(|e| e.to_string()));
            match decoded {
                Ok(image) => {
                    set.insert(image);
                    outcomes.push(FetchOutcome::Fetched {
                        module: module.clone(),
                    });
                }
                Err(reason) => {
                    warn!("reference '{}' skipped: {}", module, reason);
                    log.append(format!("Reference '{}' skipped: {}", module, reason));
                    outcomes.push(FetchOutcome::Skipped {
                        module: module.clone(),
                        reason,
                    });
                }
            }
        }
        log.append(format!("References ready ({} modules)", set.len()));

        let set = Arc::new(set);
        *guard = Some(Arc::clone(&set));
        (set, outcomes)
    }
}
