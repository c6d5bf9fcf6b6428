//! Filesystem layout of a build.
//!
//! Every path the pipeline touches is derived from an explicit workspace
//! root and a [`BuildConfig`]; nothing reads the process working directory.

use crate::config::BuildConfig;
use std::path::{Path, PathBuf};

/// Name of the plain-text manifest at the root of a packaged bundle.
pub const MANIFEST_FILE: &str = "BUILD_INFO.txt";

/// Workspace root plus the build output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    build_dir: PathBuf,
}

impl Workspace {
    /// Workspace with the default build directory `<root>/build/<arch>-<type>`.
    pub fn new(root: impl Into<PathBuf>, config: &BuildConfig) -> Self {
        let root = root.into();
        let build_dir = root
            .join("build")
            .join(format!("{}-{}", config.architecture(), config.flavor()));
        Self { root, build_dir }
    }

    /// Override where `make install` places its output.
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Top-level directory of the extracted source archive (`icu-<tag>`).
    pub fn source_root(&self, config: &BuildConfig) -> PathBuf {
        self.root.join(format!("icu-{}", config.source_tag()))
    }

    /// The `icu4c` directory inside the extracted archive.
    pub fn icu4c_dir(&self, config: &BuildConfig) -> PathBuf {
        self.source_root(config).join("icu4c")
    }

    /// `icu4c/source`, where both build systems live.
    pub fn source_dir(&self, config: &BuildConfig) -> PathBuf {
        self.icu4c_dir(config).join("source")
    }

    /// Where the downloaded source archive is cached.
    pub fn source_archive(&self, config: &BuildConfig) -> PathBuf {
        self.root
            .join(format!("icu-source-{}.tar.gz", config.source_tag()))
    }

    /// Canonical packaged directory.
    pub fn artifact_dir(&self, config: &BuildConfig) -> PathBuf {
        self.root.join(config.artifact_name())
    }

    /// Compressed archive of the canonical directory.
    pub fn artifact_archive(&self, config: &BuildConfig) -> PathBuf {
        self.root.join(format!("{}.tar.gz", config.artifact_name()))
    }
}
