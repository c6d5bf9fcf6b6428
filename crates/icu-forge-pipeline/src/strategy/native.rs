//! Visual Studio `allinone.sln` built through MSBuild.
//!
//! Data always ships as separate `.dat` files for this strategy.

use super::{with_data, BuildStrategy};
use crate::context::BuildContext;
use crate::step::{Phase, Step, StepAction, StepOutcome};
use crate::steps::{ArtifactSearch, InvokeToolchain};
use async_trait::async_trait;
use icu_forge_core::{Architecture, ArtifactPattern, BuildConfig, ForgeError, Result, StrategyKind};
use std::path::Path;
use tracing::{info, warn};

/// Solution file, relative to the source directory.
pub const SOLUTION_FILE: &str = "allinone/allinone.sln";

/// Property sheet carrying `PlatformToolset`, relative to the source directory.
pub const TOOLSET_PROPS_FILE: &str = "allinone/Build.Windows.ProjectConfiguration.props";

const CURRENT_TOOLSET: &str = "<PlatformToolset>v143</PlatformToolset>";
const OUTDATED_TOOLSETS: [&str; 2] = [
    "<PlatformToolset>v140</PlatformToolset>",
    "<PlatformToolset>v141</PlatformToolset>",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeStrategy;

/// Platform name as the ICU solution spells it.
fn msbuild_platform(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X64 => "x64",
        Architecture::X86 => "Win32",
    }
}

/// `msbuild` arguments for the full solution build.
pub fn msbuild_args(config: &BuildConfig, solution: &Path) -> Vec<String> {
    vec![
        "msbuild".to_string(),
        solution.to_string_lossy().into_owned(),
        format!("/p:Configuration={}", config.flavor().as_str()),
        format!("/p:Platform={}", msbuild_platform(config.architecture())),
        "/p:SkipUWP=true".to_string(),
        format!("/p:UseDebugLibraries={}", config.flavor().is_debug()),
        "/m".to_string(),
        "/verbosity:normal".to_string(),
    ]
}

/// Rewrite outdated toolset versions. `None` when nothing changed.
fn upgrade_toolset(content: &str) -> Option<String> {
    if !OUTDATED_TOOLSETS.iter().any(|t| content.contains(t)) {
        return None;
    }
    Some(
        OUTDATED_TOOLSETS
            .iter()
            .fold(content.to_string(), |acc, old| acc.replace(old, CURRENT_TOOLSET)),
    )
}

#[derive(Debug, Clone, Copy)]
struct VerifySolution;

#[async_trait]
impl StepAction for VerifySolution {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let source = ctx.workspace.source_dir(&ctx.config);
        let solution = source.join(SOLUTION_FILE);
        if solution.is_file() {
            info!(path = %solution.display(), "Found Visual Studio solution");
            return Ok(StepOutcome::Completed);
        }

        let allinone = source.join("allinone");
        match std::fs::read_dir(&allinone) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                warn!(dir = %allinone.display(), entries = ?names, "Solution missing; directory contents");
            }
            Err(_) => warn!(dir = %allinone.display(), "allinone directory not found"),
        }
        Err(ForgeError::MissingInput(solution))
    }
}

/// Non-fatal: a tree that cannot be upgraded may still build.
#[derive(Debug, Clone, Copy)]
struct UpdateToolset;

#[async_trait]
impl StepAction for UpdateToolset {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let props = ctx.workspace.source_dir(&ctx.config).join(TOOLSET_PROPS_FILE);

        let content = match tokio::fs::read_to_string(&props).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %props.display(), error = %e, "Could not read toolset properties");
                return Ok(StepOutcome::Skipped("toolset properties unavailable".to_string()));
            }
        };

        let Some(updated) = upgrade_toolset(&content) else {
            return Ok(StepOutcome::Skipped("toolset already current".to_string()));
        };

        if let Err(e) = tokio::fs::write(&props, updated).await {
            warn!(path = %props.display(), error = %e, "Could not update toolset");
            return Ok(StepOutcome::Skipped("toolset update failed".to_string()));
        }
        info!(path = %props.display(), "Updated toolset to v143 (Visual Studio 2022)");
        Ok(StepOutcome::Completed)
    }
}

impl BuildStrategy for NativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    fn build_steps(&self, ctx: &BuildContext) -> Vec<Step> {
        let solution = ctx.workspace.source_dir(&ctx.config).join(SOLUTION_FILE);
        let args = msbuild_args(&ctx.config, &solution);
        let mut data_args = args.clone();
        data_args.push("/target:MakeData".to_string());

        vec![
            Step::new(
                "Verify Visual Studio solution",
                Phase::PrepareToolchain,
                VerifySolution,
            ),
            Step::new("Update Visual Studio toolset", Phase::Configure, UpdateToolset),
            Step::new(
                "Build ICU with MSBuild",
                Phase::Compile,
                InvokeToolchain::new("Build ICU with MSBuild", ctx.workspace.root(), args),
            ),
            Step::new(
                "Build ICU data",
                Phase::Collect,
                InvokeToolchain::new("Build ICU data", ctx.workspace.root(), data_args),
            ),
        ]
    }

    fn artifact_search(&self, ctx: &BuildContext) -> ArtifactSearch {
        let source = ctx.workspace.source_dir(&ctx.config);
        let icu4c = ctx.workspace.icu4c_dir(&ctx.config);
        let up = source.join("..").join("..");

        let binaries = vec![
            icu4c.join("bin64"),
            icu4c.join("lib64"),
            icu4c.join("bin"),
            icu4c.join("lib"),
            up.join("lib64"),
            up.join("bin64"),
        ];
        let headers = ["common", "i18n", "io"]
            .iter()
            .map(|module| source.join(module).join("unicode"))
            .collect();

        let search = ArtifactSearch::new()
            .group(
                binaries,
                vec![ArtifactPattern::library(), ArtifactPattern::executable()],
            )
            .group(headers, vec![ArtifactPattern::header()]);
        with_data(search, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icu_forge_core::{DataPackaging, Flavor};

    #[test]
    fn test_msbuild_args_debug_x86() {
        let config = BuildConfig::new(
            Architecture::X86,
            Flavor::Debuggable,
            DataPackaging::SeparateFile,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        let args = msbuild_args(&config, Path::new("allinone.sln"));

        assert_eq!(args[0], "msbuild");
        assert!(args.contains(&"/p:Configuration=Debug".to_string()));
        assert!(args.contains(&"/p:Platform=Win32".to_string()));
        assert!(args.contains(&"/p:UseDebugLibraries=true".to_string()));
        assert!(args.contains(&"/p:SkipUWP=true".to_string()));
    }

    #[test]
    fn test_upgrade_toolset() {
        let old = "<PlatformToolset>v141</PlatformToolset>\n<PlatformToolset>v140</PlatformToolset>";
        let new = upgrade_toolset(old).unwrap();
        assert_eq!(new.matches(CURRENT_TOOLSET).count(), 2);
        assert!(upgrade_toolset(&new).is_none());
    }
}
