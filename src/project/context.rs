//! Collaborators and per-build state

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;

use crate::config::AnalysisOptions;
use crate::error::Cancelled;

use super::document::Import;
use super::providers::{FileSchemaProvider, SchemaProvider, TaskDefinitionProvider};
use super::runtime::RuntimeInformation;
use super::sdk::{RegistrySdkResolver, SdkResolver};

/// Everything a build needs from the host.
///
/// Cheap to clone; one context can serve many builds.
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub runtime: Arc<dyn RuntimeInformation>,
    pub sdk_resolver: Arc<dyn SdkResolver>,
    pub schema_provider: Arc<dyn SchemaProvider>,
    pub task_provider: Option<Arc<dyn TaskDefinitionProvider>>,
    pub options: AnalysisOptions,
    pub cancel: CancellationToken,
}

impl ParseContext {
    /// Context with the registry SDK resolver and file schema provider.
    pub fn new(runtime: Arc<dyn RuntimeInformation>) -> Self {
        Self {
            sdk_resolver: Arc::new(RegistrySdkResolver::new(Arc::clone(&runtime))),
            schema_provider: Arc::new(FileSchemaProvider),
            task_provider: None,
            options: AnalysisOptions::default(),
            cancel: CancellationToken::new(),
            runtime,
        }
    }

    pub fn with_sdk_resolver(mut self, resolver: Arc<dyn SdkResolver>) -> Self {
        self.sdk_resolver = resolver;
        self
    }

    pub fn with_schema_provider(mut self, provider: Arc<dyn SchemaProvider>) -> Self {
        self.schema_provider = provider;
        self
    }

    pub fn with_task_provider(mut self, provider: Arc<dyn TaskDefinitionProvider>) -> Self {
        self.task_provider = Some(provider);
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }
}

/// Mutable state of one build, owned by the builder.
#[derive(Debug, Default)]
pub(crate) struct BuildState {
    /// Every file loaded so far; each file is imported once per build
    pub imported: FxHashSet<PathBuf>,
    /// Files currently being built, outermost first
    pub in_progress: Vec<PathBuf>,
    /// Resolution failures already logged
    pub failed_resolutions: FxHashSet<String>,
    /// Resolved imports by path
    pub resolved: FxHashMap<PathBuf, Arc<Import>>,
}

impl BuildState {
    /// Record a failure; `true` the first time it is seen.
    pub fn first_failure(&mut self, key: String) -> bool {
        self.failed_resolutions.insert(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::StaticRuntimeInformation;

    #[test]
    fn test_cancellation() {
        let cancel = CancellationToken::new();
        let cx = ParseContext::new(Arc::new(StaticRuntimeInformation::default())).with_cancellation(cancel.clone());
        assert!(cx.check_cancelled().is_ok());
        cancel.cancel();
        assert_eq!(cx.check_cancelled(), Err(Cancelled));
    }

    #[test]
    fn test_failures_logged_once() {
        let mut state = BuildState::default();
        assert!(state.first_failure("sdk:Missing".into()));
        assert!(!state.first_failure("sdk:Missing".into()));
    }
}
