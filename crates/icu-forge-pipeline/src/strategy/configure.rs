//! `runConfigureICU` + `make` under Cygwin, compiling with MSVC.

use super::{with_data, BuildStrategy};
use crate::context::BuildContext;
use crate::step::{Phase, Step, StepAction, StepOutcome};
use crate::steps::{ArtifactSearch, InvokeToolchain};
use async_trait::async_trait;
use icu_forge_core::{
    Architecture, ArtifactPattern, BuildConfig, DataPackaging, ForgeError, Result, StrategyKind,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Written into the source directory once line endings and permissions
/// have been fixed.
pub const PREPARED_MARKER: &str = ".icu-forge-prepared";

#[derive(Debug, Clone)]
pub struct ConfigureStrategy {
    cygwin_root: PathBuf,
}

impl ConfigureStrategy {
    pub fn new(cygwin_root: impl Into<PathBuf>) -> Self {
        Self {
            cygwin_root: cygwin_root.into(),
        }
    }

    /// `bash --login -o igncr -c <script>` from the Cygwin install.
    pub fn shell_args(&self, script: String) -> Vec<String> {
        let bash = self.cygwin_root.join("bin").join("bash.exe");
        vec![
            bash.to_string_lossy().into_owned(),
            "--login".to_string(),
            "-o".to_string(),
            "igncr".to_string(),
            "-c".to_string(),
            script,
        ]
    }

    fn shell_step(&self, ctx: &BuildContext, label: &str, script: String) -> InvokeToolchain {
        InvokeToolchain::new(label, ctx.workspace.root(), self.shell_args(script))
    }
}

/// Arguments passed to `runConfigureICU`.
pub fn configure_args(config: &BuildConfig, prefix: &Path) -> Vec<String> {
    let mut args = vec![
        "Cygwin/MSVC".to_string(),
        "--enable-static".to_string(),
        "--disable-shared".to_string(),
        "--disable-samples".to_string(),
        "--disable-tests".to_string(),
        "--disable-extras".to_string(),
        format!("--prefix={}", posix(prefix)),
    ];
    if config.data_packaging() == DataPackaging::Embedded {
        args.push("--with-data-packaging=static".to_string());
    }
    args
}

/// Puts the MSVC and Windows SDK tools ahead of Cygwin's and moves
/// `/usr/bin` to the end of `PATH` so MSVC's `link.exe` is found first.
pub fn msvc_prologue(arch: Architecture) -> String {
    let arch = arch.as_str();
    format!(
        r#"if [ -n "$VCINSTALLDIR" ]; then
    VC_ROOT=$(cygpath -u "$VCINSTALLDIR")
    MSVC_BIN=$(find "${{VC_ROOT}}Tools/MSVC" -mindepth 1 -maxdepth 1 -type d | sort | tail -1)/bin/Host{arch}/{arch}
    if [ -d "$MSVC_BIN" ]; then
        export PATH="$MSVC_BIN:$PATH"
    fi
fi
if [ -n "$WindowsSdkBinPath" ]; then
    SDK_BIN=$(cygpath -u "$WindowsSdkBinPath")
    if [ -d "$SDK_BIN" ]; then
        export PATH="$SDK_BIN:$PATH"
    fi
fi
export PATH="$(echo "$PATH" | sed -e 's|/usr/bin:||g' -e 's|:/usr/bin||g'):/usr/bin"
"#
    )
}

/// A script that enters `dir` with the MSVC environment in place.
fn toolchain_script(arch: Architecture, dir: &Path, body: &str) -> String {
    format!(
        "{}cd \"$(cygpath -u '{}')\"\n{}\n",
        msvc_prologue(arch),
        posix(dir),
        body
    )
}

fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Fix CRLF line endings and execute bits in the unpacked tree, once.
#[derive(Debug, Clone)]
struct PrepareSource {
    command: InvokeToolchain,
}

#[async_trait]
impl StepAction for PrepareSource {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome> {
        let marker = ctx.workspace.source_dir(&ctx.config).join(PREPARED_MARKER);
        if marker.is_file() {
            info!(path = %marker.display(), "Source tree already prepared");
            return Ok(StepOutcome::Skipped("source tree already prepared".to_string()));
        }

        self.command.execute(ctx).await?;

        tokio::fs::write(&marker, ctx.run_id.to_string())
            .await
            .map_err(|e| ForgeError::io_at(&marker, e))?;
        Ok(StepOutcome::Completed)
    }
}

impl BuildStrategy for ConfigureStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Configure
    }

    fn build_steps(&self, ctx: &BuildContext) -> Vec<Step> {
        let config = &ctx.config;
        let arch = config.architecture();
        let source = ctx.workspace.source_dir(config);

        let prepare = format!(
            "cd \"$(cygpath -u '{}')\"\n\
             find . -name \"*.sh\" -o -name \"*.ac\" -o -name \"*.in\" | xargs dos2unix 2>/dev/null || true\n\
             chmod +x runConfigureICU configure install-sh 2>/dev/null || true\n",
            posix(&source)
        );

        let configure = toolchain_script(
            arch,
            &source,
            &format!(
                "./runConfigureICU {}",
                configure_args(config, ctx.workspace.build_dir()).join(" ")
            ),
        );

        match config.data_packaging() {
            DataPackaging::Embedded => info!("Using static data packaging (embedded data)"),
            DataPackaging::SeparateFile => info!("Using separate data packaging (.dat files)"),
        }

        vec![
            Step::new(
                "Prepare source",
                Phase::PrepareToolchain,
                PrepareSource {
                    command: self.shell_step(ctx, "Prepare source", prepare),
                },
            ),
            Step::new(
                "Configure build",
                Phase::Configure,
                self.shell_step(ctx, "Configure build", configure)
                    .with_env("CPPFLAGS", "-MD")
                    .with_env("CFLAGS", "-MD")
                    .with_env("CXXFLAGS", "-MD /std:c++17"),
            ),
            Step::new(
                "Build ICU",
                Phase::Compile,
                self.shell_step(
                    ctx,
                    "Build ICU",
                    toolchain_script(arch, &source, "make -j$(nproc)"),
                ),
            ),
            Step::new(
                "Install ICU",
                Phase::Collect,
                self.shell_step(
                    ctx,
                    "Install ICU",
                    toolchain_script(arch, &source, "make install"),
                ),
            ),
        ]
    }

    fn artifact_search(&self, ctx: &BuildContext) -> ArtifactSearch {
        let build = ctx.workspace.build_dir();
        let search = ArtifactSearch::new()
            .group(vec![build.join("lib")], vec![ArtifactPattern::library()])
            .group(vec![build.join("bin")], vec![ArtifactPattern::executable()])
            .group(
                vec![build.join("include").join("unicode")],
                vec![ArtifactPattern::header()],
            );
        with_data(search, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icu_forge_core::Flavor;

    fn config(packaging: DataPackaging) -> BuildConfig {
        BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            packaging,
            "77.1",
            "release-77-1",
        )
        .unwrap()
    }

    #[test]
    fn test_configure_args_embedded() {
        let args = configure_args(&config(DataPackaging::Embedded), Path::new("D:\\ws\\build"));
        assert_eq!(args[0], "Cygwin/MSVC");
        assert!(args.contains(&"--prefix=D:/ws/build".to_string()));
        assert!(args.contains(&"--with-data-packaging=static".to_string()));
    }

    #[test]
    fn test_configure_args_separate() {
        let args = configure_args(&config(DataPackaging::SeparateFile), Path::new("/b"));
        assert!(!args.iter().any(|a| a.starts_with("--with-data-packaging")));
        assert!(args.contains(&"--disable-shared".to_string()));
    }

    #[test]
    fn test_prologue_targets_arch_and_moves_usr_bin_last() {
        let script = msvc_prologue(Architecture::X86);
        assert!(script.contains("bin/Hostx86/x86"));
        assert!(script.trim_end().ends_with(":/usr/bin\""));
    }

    #[test]
    fn test_shell_args_wrap_script() {
        let strategy = ConfigureStrategy::new("D:/cygwin");
        let args = strategy.shell_args("make install".to_string());
        assert!(args[0].ends_with("bash.exe"));
        assert_eq!(&args[1..5], &["--login", "-o", "igncr", "-c"]);
        assert_eq!(args[5], "make install");
    }
}
