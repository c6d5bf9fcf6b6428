//! Build strategies.
//!
//! Both strategies share one pipeline shape: acquire source, then the
//! strategy's own toolchain steps, then package and verify. A strategy only
//! contributes the middle steps and the places its outputs may land.

mod configure;
mod native;

pub use configure::{ConfigureStrategy, PREPARED_MARKER};
pub use native::{NativeStrategy, SOLUTION_FILE, TOOLSET_PROPS_FILE};

use crate::context::BuildContext;
use crate::step::{Phase, Step};
use crate::steps::{AcquireSource, ArtifactSearch, PackageArtifacts, VerifyBuild};
use icu_forge_core::{ArtifactPattern, DataPackaging, StrategyKind};
use std::path::PathBuf;

/// A parameterisation of the shared pipeline shape.
pub trait BuildStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Steps between source acquisition and packaging, in order.
    fn build_steps(&self, ctx: &BuildContext) -> Vec<Step>;

    /// Candidate output locations for the packaging step.
    fn artifact_search(&self, ctx: &BuildContext) -> ArtifactSearch;
}

/// The full step sequence for `strategy`.
pub fn assemble(strategy: &dyn BuildStrategy, ctx: &BuildContext) -> Vec<Step> {
    let mut steps = vec![Step::new(
        "Download ICU source",
        Phase::AcquireSource,
        AcquireSource,
    )];
    steps.extend(strategy.build_steps(ctx));
    steps.push(Step::new(
        "Package artifacts",
        Phase::Package,
        PackageArtifacts::new(strategy.kind(), strategy.artifact_search(ctx)),
    ));
    steps.push(Step::new("Verify build", Phase::Verify, VerifyBuild));
    steps
}

/// Construct the strategy for `kind`.
pub fn strategy_for(kind: StrategyKind, cygwin_root: impl Into<PathBuf>) -> Box<dyn BuildStrategy> {
    match kind {
        StrategyKind::Configure => Box::new(ConfigureStrategy::new(cygwin_root)),
        StrategyKind::Native => Box::new(NativeStrategy),
    }
}

/// Where separately packaged `.dat` files end up, for either strategy.
pub(crate) fn data_candidates(ctx: &BuildContext) -> Vec<PathBuf> {
    let source = ctx.workspace.source_dir(&ctx.config);
    let icu4c = ctx.workspace.icu4c_dir(&ctx.config);
    vec![
        source.join("data").join("out"),
        source.join("data").join("out").join("tmp"),
        icu4c.join("data").join("out"),
        icu4c.join("data"),
    ]
}

/// Add the data search when the build keeps data in separate files.
pub(crate) fn with_data(search: ArtifactSearch, ctx: &BuildContext) -> ArtifactSearch {
    match ctx.config.data_packaging() {
        DataPackaging::SeparateFile => {
            search.group(data_candidates(ctx), vec![ArtifactPattern::data()])
        }
        DataPackaging::Embedded => search,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ToolchainEnv;
    use crate::fakes::{FakeInvoker, FakeSourceProvider};
    use icu_forge_core::{Architecture, BuildConfig, Flavor, Workspace};
    use std::sync::Arc;

    fn context(packaging: DataPackaging) -> BuildContext {
        let config = BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            packaging,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        let workspace = Workspace::new("/ws", &config);
        BuildContext::new(
            config,
            workspace,
            ToolchainEnv::default(),
            Arc::new(FakeInvoker::new()),
            Arc::new(FakeSourceProvider::new()),
        )
    }

    fn names(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_configure_sequence() {
        let ctx = context(DataPackaging::Embedded);
        let strategy = strategy_for(StrategyKind::Configure, "D:/cygwin");
        let steps = assemble(strategy.as_ref(), &ctx);

        assert_eq!(
            names(&steps),
            vec![
                "Download ICU source",
                "Prepare source",
                "Configure build",
                "Build ICU",
                "Install ICU",
                "Package artifacts",
                "Verify build",
            ]
        );
        let phases: Vec<Phase> = steps.iter().map(|s| s.phase()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::AcquireSource,
                Phase::PrepareToolchain,
                Phase::Configure,
                Phase::Compile,
                Phase::Collect,
                Phase::Package,
                Phase::Verify,
            ]
        );
    }

    #[test]
    fn test_native_sequence() {
        let ctx = context(DataPackaging::SeparateFile);
        let strategy = strategy_for(StrategyKind::Native, "unused");
        let steps = assemble(strategy.as_ref(), &ctx);

        assert_eq!(
            names(&steps),
            vec![
                "Download ICU source",
                "Verify Visual Studio solution",
                "Update Visual Studio toolset",
                "Build ICU with MSBuild",
                "Build ICU data",
                "Package artifacts",
                "Verify build",
            ]
        );
    }

    #[test]
    fn test_data_search_only_for_separate_files() {
        let embedded = context(DataPackaging::Embedded);
        let separate = context(DataPackaging::SeparateFile);

        assert!(with_data(ArtifactSearch::new(), &embedded).groups.is_empty());
        let search = with_data(ArtifactSearch::new(), &separate);
        assert_eq!(search.groups.len(), 1);
        assert_eq!(search.groups[0].candidates.len(), 4);
    }
}
