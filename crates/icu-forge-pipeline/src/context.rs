//! Shared, read-only state for one pipeline run.

use crate::env::ToolchainEnv;
use crate::invoker::ToolchainInvoker;
use crate::source::SourceProvider;
use icu_forge_core::{BuildConfig, Workspace};
use std::sync::Arc;
use uuid::Uuid;

/// Everything a step may consult. Built once per run; never mutated.
pub struct BuildContext {
    pub run_id: Uuid,
    pub config: BuildConfig,
    pub workspace: Workspace,
    pub toolchain_env: ToolchainEnv,
    pub invoker: Arc<dyn ToolchainInvoker>,
    pub source: Arc<dyn SourceProvider>,
}

impl BuildContext {
    pub fn new(
        config: BuildConfig,
        workspace: Workspace,
        toolchain_env: ToolchainEnv,
        invoker: Arc<dyn ToolchainInvoker>,
        source: Arc<dyn SourceProvider>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            workspace,
            toolchain_env,
            invoker,
            source,
        }
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}
