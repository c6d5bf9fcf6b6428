//! ICU Forge - static ICU builds for Windows
//!
//! The `icu-forge` command drives a full ICU4C build and packages the result
//! into one canonical layout.
//!
//! ## Commands
//!
//! - `build`: Download, build, package and verify ICU
//! - `verify`: Re-check an already packaged directory

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use icu_forge_core::{
    Architecture, BuildConfig, BuildVerifier, DataPackaging, Flavor, StrategyKind, Workspace,
};
use icu_forge_pipeline::{
    assemble, strategy_for, BuildContext, HttpSourceProvider, Pipeline, ProcessInvoker,
    StepStatus, ToolchainEnv, DEFAULT_SOURCE_URL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "icu-forge")]
#[command(author = "ICU Forge Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build ICU as static libraries for Windows", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, package and verify ICU
    Build {
        /// Build strategy (configure, native)
        #[arg(long, default_value = "configure")]
        strategy: StrategyKind,

        #[command(flatten)]
        target: TargetArgs,

        /// ICU library version
        #[arg(long, default_value = "77.1")]
        icu_version: String,

        /// Source tag to download
        #[arg(long, default_value = "release-77-1")]
        tag: String,

        /// Workspace directory
        #[arg(long, env = "ICU_FORGE_WORKSPACE", default_value = ".")]
        workspace: PathBuf,

        /// Build output directory (default: <workspace>/build/<arch>-<build type>)
        #[arg(long, env = "ICU_FORGE_BUILD_DIR")]
        build_dir: Option<PathBuf>,

        /// Cygwin installation root
        #[arg(long, env = "ICU_FORGE_CYGWIN_ROOT", default_value = "D:/cygwin")]
        cygwin_root: PathBuf,

        /// Base URL for source tag archives
        #[arg(long, env = "ICU_FORGE_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
        source_url_base: String,
    },

    /// Verify a packaged ICU directory
    Verify {
        /// Packaged directory to check
        #[arg(long)]
        dir: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the verification report as JSON
        #[arg(long)]
        report_json: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TargetArgs {
    /// Target architecture (x64, x86)
    #[arg(long, default_value = "x64")]
    arch: Architecture,

    /// Build type (Release, Debug)
    #[arg(long, default_value = "Release")]
    build_type: Flavor,

    /// Embed ICU data in the library instead of shipping .dat files
    #[arg(long)]
    embed_data: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    icu_forge_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Build {
            strategy,
            target,
            icu_version,
            tag,
            workspace,
            build_dir,
            cygwin_root,
            source_url_base,
        } => {
            let config = build_config(strategy, &target, &icu_version, &tag)?;
            cmd_build(
                strategy,
                config,
                &workspace,
                build_dir.as_deref(),
                &cygwin_root,
                &source_url_base,
            )
            .await
        }
        Commands::Verify {
            dir,
            target,
            report_json,
        } => {
            let config = build_config(StrategyKind::Configure, &target, "77.1", "release-77-1")?;
            cmd_verify(&dir, &config, report_json)
        }
    }
}

/// Resolve CLI arguments into a validated configuration.
fn build_config(
    strategy: StrategyKind,
    target: &TargetArgs,
    icu_version: &str,
    tag: &str,
) -> Result<BuildConfig> {
    let packaging = match strategy {
        StrategyKind::Native if target.embed_data => {
            warn!("--embed-data is ignored by the native strategy; data ships as .dat files");
            DataPackaging::SeparateFile
        }
        StrategyKind::Native => DataPackaging::SeparateFile,
        StrategyKind::Configure => DataPackaging::from_embed_flag(target.embed_data),
    };
    BuildConfig::new(
        target.arch,
        target.build_type,
        packaging,
        icu_version,
        tag,
    )
    .context("Invalid build configuration")
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

async fn cmd_build(
    strategy: StrategyKind,
    config: BuildConfig,
    workspace_root: &Path,
    build_dir: Option<&Path>,
    cygwin_root: &Path,
    source_url_base: &str,
) -> Result<()> {
    let mut workspace = Workspace::new(absolute(workspace_root)?, &config);
    if let Some(dir) = build_dir {
        workspace = workspace.with_build_dir(absolute(dir)?);
    }

    info!(
        version = config.library_version(),
        arch = %config.architecture(),
        build_type = %config.flavor(),
        packaging = config.data_packaging().description(),
        strategy = %strategy,
        "Starting ICU build"
    );

    let source = HttpSourceProvider::new(source_url_base)
        .context("Failed to create source provider")?;
    let ctx = BuildContext::new(
        config,
        workspace,
        ToolchainEnv::from_process(),
        Arc::new(ProcessInvoker),
        Arc::new(source),
    );
    let artifact_dir = ctx.workspace.artifact_dir(&ctx.config);
    let archive = ctx.workspace.artifact_archive(&ctx.config);

    let strategy = strategy_for(strategy, cygwin_root);
    let steps = assemble(strategy.as_ref(), &ctx);
    let result = Pipeline::new(ctx).run(steps).await;

    // Print results
    println!("Run ID: {}", result.run_id);
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms);
    println!();

    for step in &result.steps {
        let status = match step.status {
            StepStatus::Completed if step.message.is_some() => "!",
            StepStatus::Completed => "✓",
            StepStatus::Skipped => "-",
            StepStatus::Failed => "✗",
        };
        match &step.message {
            Some(message) => println!("  {} {} ({}ms): {}", status, step.name, step.duration_ms, message),
            None => println!("  {} {} ({}ms)", status, step.name, step.duration_ms),
        }
    }

    if let Some(failure) = &result.failure {
        anyhow::bail!("Build failed at step: {}: {}", failure.step, failure.error)
    }

    println!();
    println!("✓ ICU build completed");
    println!("Artifacts: {}", artifact_dir.display());
    println!("Archive: {}", archive.display());
    Ok(())
}

fn cmd_verify(dir: &Path, config: &BuildConfig, report_json: bool) -> Result<()> {
    let report = BuildVerifier::verify(dir, config)
        .with_context(|| format!("Verification failed for {}", dir.display()))?;

    if report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Libraries:");
    for lib in &report.libraries {
        println!("  {} ({} bytes)", lib.file_name(), lib.size_bytes);
    }
    println!("Total library size: {} bytes", report.total_library_bytes);
    println!("Headers: {}", report.header_count);
    if let Some(data) = &report.data_library {
        println!("Data library: {}", data.file_name());
    }
    for data in &report.data_files {
        println!("Data file: {} ({} bytes)", data.file_name(), data.size_bytes);
    }
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
    println!("✓ Verification passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let cli = Cli::try_parse_from(["icu-forge", "build"]).unwrap();
        let Commands::Build {
            strategy,
            target,
            icu_version,
            tag,
            ..
        } = cli.command
        else {
            panic!("expected build command");
        };

        assert_eq!(strategy, StrategyKind::Configure);
        assert_eq!(target.arch, Architecture::X64);
        assert_eq!(target.build_type, Flavor::Optimized);
        assert_eq!(icu_version, "77.1");
        assert_eq!(tag, "release-77-1");

        let config = build_config(strategy, &target, &icu_version, &tag).unwrap();
        assert_eq!(config.artifact_name(), "icu-x64-Release-separate-data");
    }

    #[test]
    fn test_invalid_arch_rejected() {
        assert!(Cli::try_parse_from(["icu-forge", "build", "--arch", "arm64"]).is_err());
    }

    #[test]
    fn test_native_ignores_embed_data() {
        let cli = Cli::try_parse_from([
            "icu-forge",
            "build",
            "--strategy",
            "native",
            "--embed-data",
            "--build-type",
            "Debug",
        ])
        .unwrap();
        let Commands::Build {
            strategy, target, ..
        } = cli.command
        else {
            panic!("expected build command");
        };

        let config = build_config(strategy, &target, "77.1", "release-77-1").unwrap();
        assert_eq!(config.data_packaging(), DataPackaging::SeparateFile);
        assert_eq!(config.artifact_name(), "icu-x64-Debug-separate-data");
    }

    #[test]
    fn test_empty_tag_rejected() {
        let target = TargetArgs {
            arch: Architecture::X86,
            build_type: Flavor::Optimized,
            embed_data: true,
        };
        assert!(build_config(StrategyKind::Configure, &target, "77.1", "").is_err());
    }

    #[test]
    fn test_cmd_verify_on_packaged_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::create_dir_all(dir.path().join("include").join("unicode")).unwrap();
        std::fs::write(dir.path().join("lib").join("sicuuc.lib"), b"lib").unwrap();
        std::fs::write(
            dir.path().join("include").join("unicode").join("utypes.h"),
            b"h",
        )
        .unwrap();

        let config = BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            DataPackaging::Embedded,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        assert!(cmd_verify(dir.path(), &config, true).is_ok());
        assert!(cmd_verify(&dir.path().join("missing"), &config, false).is_err());
    }
}
