//! Step actions shared by both strategies.

use crate::context::BuildContext;
use crate::invoker::ExitOutcome;
use crate::step::{StepAction, StepOutcome};
use async_trait::async_trait;
use icu_forge_core::{
    ArtifactKind, ArtifactLocator, ArtifactPackager, ArtifactPattern, ArtifactSet, BuildVerifier,
    ForgeError, Result, StrategyKind,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Lines of captured output carried into a toolchain failure.
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Fetch and unpack the ICU source unless the source tree already exists.
#[derive(Debug, Clone, Default)]
pub struct AcquireSource;

#[async_trait]
impl StepAction for AcquireSource {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let source_dir = ctx.workspace.source_dir(&ctx.config);
        if source_dir.is_dir() {
            info!(path = %source_dir.display(), "ICU source already present");
            return Ok(StepOutcome::Skipped(format!(
                "source tree exists at {}",
                source_dir.display()
            )));
        }

        tokio::fs::create_dir_all(ctx.workspace.root())
            .await
            .map_err(|e| ForgeError::io_at(ctx.workspace.root(), e))?;
        ctx.source.fetch(&ctx.config, &ctx.workspace).await?;
        Ok(StepOutcome::Completed)
    }
}

/// One external toolchain command. A non-zero exit fails the step.
#[derive(Debug, Clone)]
pub struct InvokeToolchain {
    pub label: String,
    pub dir: PathBuf,
    pub args: Vec<String>,
    /// Layered over the resolved toolchain environment.
    pub env: BTreeMap<String, String>,
}

impl InvokeToolchain {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub(crate) async fn execute(&self, ctx: &BuildContext) -> Result<ExitOutcome> {
        info!(label = %self.label, dir = %self.dir.display(), "Invoking toolchain");

        let env = ctx.toolchain_env.merged(&self.env);
        let outcome = ctx.invoker.invoke(&self.dir, &self.args, &env).await?;

        if !outcome.passed() {
            return Err(ForgeError::Toolchain {
                label: self.label.clone(),
                exit_code: outcome.exit_code,
                stderr: outcome.diagnostic_tail(DIAGNOSTIC_TAIL_LINES),
            });
        }

        info!(
            label = %self.label,
            duration_ms = outcome.duration_ms,
            "Toolchain command succeeded"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl StepAction for InvokeToolchain {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        self.execute(ctx).await?;
        Ok(StepOutcome::Completed)
    }
}

/// Candidate directories paired with the patterns to look for in them.
#[derive(Debug, Clone)]
pub struct SearchGroup {
    pub candidates: Vec<PathBuf>,
    pub patterns: Vec<ArtifactPattern>,
}

impl SearchGroup {
    pub fn new(candidates: Vec<PathBuf>, patterns: Vec<ArtifactPattern>) -> Self {
        Self {
            candidates,
            patterns,
        }
    }
}

/// Where a strategy expects its outputs.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSearch {
    pub groups: Vec<SearchGroup>,
}

impl ArtifactSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, candidates: Vec<PathBuf>, patterns: Vec<ArtifactPattern>) -> Self {
        self.groups.push(SearchGroup::new(candidates, patterns));
        self
    }

    /// Run every group through an [`ArtifactLocator`] and merge the results.
    pub fn collect(&self) -> ArtifactSet {
        let mut set = ArtifactSet::new();
        for group in &self.groups {
            let locator = ArtifactLocator::new(group.patterns.clone());
            set.extend(locator.locate(&group.candidates));
        }
        set
    }
}

/// Locate outputs and package them into the canonical layout.
#[derive(Debug, Clone)]
pub struct PackageArtifacts {
    strategy: StrategyKind,
    search: ArtifactSearch,
}

impl PackageArtifacts {
    pub fn new(strategy: StrategyKind, search: ArtifactSearch) -> Self {
        Self { strategy, search }
    }
}

#[async_trait]
impl StepAction for PackageArtifacts {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let set = self.search.collect();
        info!(
            libraries = set.count(ArtifactKind::Library),
            executables = set.count(ArtifactKind::Executable),
            headers = set.count(ArtifactKind::Header),
            data = set.count(ArtifactKind::Data),
            "Located build artifacts"
        );

        let packager = ArtifactPackager::new(self.strategy, ctx.run_id);
        let bundle = packager.package(&set, &ctx.config, ctx.workspace.root())?;
        info!(
            dir = %bundle.dir.display(),
            files = bundle.files,
            "Package directory ready"
        );
        Ok(StepOutcome::Completed)
    }
}

/// Check the packaged directory for its postconditions.
#[derive(Debug, Clone, Default)]
pub struct VerifyBuild;

#[async_trait]
impl StepAction for VerifyBuild {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let dir = ctx.workspace.artifact_dir(&ctx.config);
        let report = BuildVerifier::verify(&dir, &ctx.config)?;

        info!(
            libraries = report.libraries.len(),
            headers = report.header_count,
            warnings = report.warnings.len(),
            "Build verification passed"
        );
        if report.has_warnings() {
            return Ok(StepOutcome::CompletedWithWarnings(report.warnings));
        }
        Ok(StepOutcome::Completed)
    }
}
