//! Build request definitions.
//!
//! A [`BuildConfig`] is an immutable description of one build. Every
//! enumerated field is parsed from a closed value set, and the derived
//! names (artifact bundle name, library prefix) are computed on access.

use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target architecture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X64,
    X86,
}

impl Architecture {
    /// Name used by MSVC, MSBuild and the artifact layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X64 => "x64",
            Architecture::X86 => "x86",
        }
    }
}

impl FromStr for Architecture {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x64" => Ok(Architecture::X64),
            "x86" => Ok(Architecture::X86),
            other => Err(ForgeError::InvalidConfig {
                field: "architecture",
                value: other.to_string(),
                expected: "x64, x86",
            }),
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build flavor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    /// `Release`
    Optimized,
    /// `Debug`
    Debuggable,
}

impl Flavor {
    /// Configuration name as understood by MSBuild.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Optimized => "Release",
            Flavor::Debuggable => "Debug",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Flavor::Debuggable)
    }
}

impl FromStr for Flavor {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Release" | "release" => Ok(Flavor::Optimized),
            "Debug" | "debug" => Ok(Flavor::Debuggable),
            other => Err(ForgeError::InvalidConfig {
                field: "build type",
                value: other.to_string(),
                expected: "Release, Debug",
            }),
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the ICU data blob is shipped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataPackaging {
    /// Data linked into a static `icudt` library.
    Embedded,
    /// Data shipped as standalone `.dat` files.
    SeparateFile,
}

impl DataPackaging {
    pub fn from_embed_flag(embed: bool) -> Self {
        if embed {
            DataPackaging::Embedded
        } else {
            DataPackaging::SeparateFile
        }
    }

    /// Suffix of the artifact bundle name.
    pub fn artifact_suffix(&self) -> &'static str {
        match self {
            DataPackaging::Embedded => "static-data",
            DataPackaging::SeparateFile => "separate-data",
        }
    }

    /// Human-readable description recorded in the manifest.
    pub fn description(&self) -> &'static str {
        match self {
            DataPackaging::Embedded => "Static (embedded)",
            DataPackaging::SeparateFile => "Separate (.dat files)",
        }
    }
}

/// Build strategy identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// `runConfigureICU` + `make` under Cygwin with MSVC.
    Configure,
    /// `allinone.sln` through MSBuild.
    Native,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Configure => "configure",
            StrategyKind::Native => "native",
        }
    }

    /// Build environment line for the manifest.
    pub fn environment(&self) -> &'static str {
        match self {
            StrategyKind::Configure => "Cygwin/MSVC (runConfigureICU + make)",
            StrategyKind::Native => "Native Windows (MSBuild)",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configure" => Ok(StrategyKind::Configure),
            "native" => Ok(StrategyKind::Native),
            other => Err(ForgeError::InvalidConfig {
                field: "strategy",
                value: other.to_string(),
                expected: "configure, native",
            }),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One build request. Fields are private so a value never changes after
/// construction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BuildConfig {
    architecture: Architecture,
    flavor: Flavor,
    data_packaging: DataPackaging,
    library_version: String,
    source_tag: String,
}

impl BuildConfig {
    /// Create a build configuration. Version and tag must be non-empty.
    pub fn new(
        architecture: Architecture,
        flavor: Flavor,
        data_packaging: DataPackaging,
        library_version: impl Into<String>,
        source_tag: impl Into<String>,
    ) -> Result<Self, ForgeError> {
        let library_version = library_version.into();
        let source_tag = source_tag.into();

        if library_version.trim().is_empty() {
            return Err(ForgeError::InvalidConfig {
                field: "library version",
                value: library_version,
                expected: "a non-empty version such as 77.1",
            });
        }
        if source_tag.trim().is_empty() || source_tag.contains(['/', '\\']) {
            return Err(ForgeError::InvalidConfig {
                field: "source tag",
                value: source_tag,
                expected: "a non-empty tag without path separators",
            });
        }

        Ok(Self {
            architecture,
            flavor,
            data_packaging,
            library_version,
            source_tag,
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn data_packaging(&self) -> DataPackaging {
        self.data_packaging
    }

    pub fn library_version(&self) -> &str {
        &self.library_version
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// `s` for embedded data, empty for separate data files.
    pub fn lib_prefix(&self) -> &'static str {
        match self.data_packaging {
            DataPackaging::Embedded => "s",
            DataPackaging::SeparateFile => "",
        }
    }

    /// File name of the library that carries embedded data.
    pub fn data_library_name(&self) -> String {
        format!("{}icudt.lib", self.lib_prefix())
    }

    /// Canonical artifact bundle name, e.g. `icu-x64-Release-static-data`.
    pub fn artifact_name(&self) -> String {
        format!(
            "icu-{}-{}-{}",
            self.architecture,
            self.flavor,
            self.data_packaging.artifact_suffix()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_artifact_name_is_deterministic() {
        assert_eq!(
            config(DataPackaging::Embedded).artifact_name(),
            "icu-x64-Release-static-data"
        );
        assert_eq!(
            config(DataPackaging::SeparateFile).artifact_name(),
            "icu-x64-Release-separate-data"
        );
    }

    #[test]
    fn test_lib_prefix_depends_on_packaging() {
        assert_eq!(config(DataPackaging::Embedded).lib_prefix(), "s");
        assert_eq!(config(DataPackaging::SeparateFile).lib_prefix(), "");
        assert_eq!(
            config(DataPackaging::Embedded).data_library_name(),
            "sicudt.lib"
        );
    }

    #[test]
    fn test_parse_closed_value_sets() {
        assert_eq!("x86".parse::<Architecture>().unwrap(), Architecture::X86);
        assert_eq!("Debug".parse::<Flavor>().unwrap(), Flavor::Debuggable);
        assert_eq!(
            "native".parse::<StrategyKind>().unwrap(),
            StrategyKind::Native
        );
        assert!("arm64".parse::<Architecture>().is_err());
        assert!("RelWithDebInfo".parse::<Flavor>().is_err());
        assert!("cmake".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_rejects_empty_version_and_bad_tag() {
        let err = BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            DataPackaging::Embedded,
            "",
            "release-77-1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("library version"));

        assert!(BuildConfig::new(
            Architecture::X64,
            Flavor::Optimized,
            DataPackaging::Embedded,
            "77.1",
            "../escape",
        )
        .is_err());
    }

    #[test]
    fn test_flavor_debug_flag() {
        assert!(Flavor::Debuggable.is_debug());
        assert!(!Flavor::Optimized.is_debug());
    }
}
