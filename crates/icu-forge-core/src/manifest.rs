//! Build manifest written next to packaged artifacts.

use crate::config::{BuildConfig, StrategyKind};
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// Write-once record of the parameters a bundle was built with.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub run_id: Uuid,
    pub strategy: StrategyKind,
    pub config: BuildConfig,
    pub built_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(run_id: Uuid, strategy: StrategyKind, config: BuildConfig) -> Self {
        Self {
            run_id,
            strategy,
            config,
            built_at: Utc::now(),
        }
    }

    /// Render the manifest as `Key: value` lines.
    pub fn render(&self) -> String {
        let prefix = match self.config.lib_prefix() {
            "" => "none",
            p => p,
        };
        format!(
            "ICU Version: {version}\n\
             Source Tag: {tag}\n\
             Architecture: {arch}\n\
             Build Type: {flavor}\n\
             Compiler: MSVC (Visual Studio 2022)\n\
             Build Environment: {env}\n\
             Strategy: {strategy}\n\
             Data Packaging: {packaging}\n\
             Library Prefix: {prefix}\n\
             Static Libraries: Yes\n\
             Shared Libraries: No\n\
             Run ID: {run_id}\n\
             Build Date: {date}\n",
            version = self.config.library_version(),
            tag = self.config.source_tag(),
            arch = self.config.architecture(),
            flavor = self.config.flavor(),
            env = self.strategy.environment(),
            strategy = self.strategy,
            packaging = self.config.data_packaging().description(),
            prefix = prefix,
            run_id = self.run_id,
            date = self.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Architecture, DataPackaging, Flavor};

    #[test]
    fn test_render_names_build_parameters() {
        let config = BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            DataPackaging::Embedded,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        let manifest = Manifest::new(Uuid::new_v4(), StrategyKind::Configure, config);
        let text = manifest.render();

        assert!(text.contains("ICU Version: 77.1"));
        assert!(text.contains("Architecture: x64"));
        assert!(text.contains("Build Type: Release"));
        assert!(text.contains("Strategy: configure"));
        assert!(text.contains("Data Packaging: Static (embedded)"));
        assert!(text.contains("Library Prefix: s"));
        assert!(text.contains(&manifest.run_id.to_string()));
    }

    #[test]
    fn test_separate_data_has_no_prefix() {
        let config = BuildConfig::new(
            Architecture::X86,
            Flavor::Debuggable,
            DataPackaging::SeparateFile,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        let text = Manifest::new(Uuid::new_v4(), StrategyKind::Native, config).render();
        assert!(text.contains("Library Prefix: none"));
        assert!(text.contains("Build Environment: Native Windows (MSBuild)"));
    }
}
