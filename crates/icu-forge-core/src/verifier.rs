//! Postcondition checks on a packaged bundle.
//!
//! Libraries and headers are mandatory. The data artifact is optional: a
//! missing one is reported as a warning because MSVC toolchains do not
//! always name the data library the way the configuration predicts.

use crate::artifacts::{has_extension, list_files, walk_files, Artifact};
use crate::config::{BuildConfig, DataPackaging};
use crate::error::{ForgeError, Postcondition, Result};
use crate::packager::megabytes;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Summary of a verified bundle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub libraries: Vec<Artifact>,
    pub total_library_bytes: u64,
    pub header_count: usize,
    /// The embedded-data library, when data packaging is embedded and it exists.
    pub data_library: Option<Artifact>,
    /// Standalone `.dat` files, for separate data packaging.
    pub data_files: Vec<Artifact>,
    pub warnings: Vec<String>,
}

impl VerificationReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Checks the canonical layout produced by the packager.
pub struct BuildVerifier;

impl BuildVerifier {
    /// Verify `packaged_dir` against `config`.
    ///
    /// Every mandatory postcondition is checked; a failure names all of the
    /// missing ones, not just the first.
    pub fn verify(packaged_dir: &Path, config: &BuildConfig) -> Result<VerificationReport> {
        info!(dir = %packaged_dir.display(), "Verifying build output");

        let mut report = VerificationReport::default();
        let mut missing = Vec::new();

        let lib_dir = packaged_dir.join("lib");
        report.libraries = matching(&lib_dir, "lib", false)?;
        report.total_library_bytes = report.libraries.iter().map(|a| a.size_bytes).sum();
        if report.libraries.is_empty() {
            warn!(dir = %lib_dir.display(), "No library files found");
            missing.push(Postcondition::Libraries);
        } else {
            for lib in &report.libraries {
                info!(
                    file = %lib.file_name(),
                    size_mb = format!("{:.2}", megabytes(lib.size_bytes)),
                    "Static library"
                );
            }
        }

        let include_dir = packaged_dir.join("include");
        report.header_count = matching(&include_dir, "h", true)?.len();
        if report.header_count == 0 {
            warn!(dir = %include_dir.display(), "Headers not found");
            missing.push(Postcondition::Headers);
        } else {
            info!(count = report.header_count, "Header files installed");
        }

        if !missing.is_empty() {
            return Err(ForgeError::MissingPostconditions(missing));
        }

        match config.data_packaging() {
            DataPackaging::Embedded => {
                let name = config.data_library_name();
                report.data_library = report
                    .libraries
                    .iter()
                    .find(|lib| lib.file_name().eq_ignore_ascii_case(&name))
                    .cloned();
                match &report.data_library {
                    Some(lib) => info!(
                        file = %lib.file_name(),
                        size_mb = format!("{:.2}", megabytes(lib.size_bytes)),
                        "Data library (embedded data)"
                    ),
                    None => {
                        let msg = format!("data library {name} not found");
                        warn!("{msg}");
                        report.warnings.push(msg);
                    }
                }
            }
            DataPackaging::SeparateFile => {
                report.data_files = matching(&packaged_dir.join("data"), "dat", false)?;
                if report.data_files.is_empty() {
                    let msg = "no .dat data files found".to_string();
                    warn!("{msg}");
                    report.warnings.push(msg);
                } else {
                    for dat in &report.data_files {
                        info!(
                            file = %dat.file_name(),
                            size_mb = format!("{:.2}", megabytes(dat.size_bytes)),
                            "Data file"
                        );
                    }
                }
            }
        }

        info!(
            total_mb = format!("{:.2}", megabytes(report.total_library_bytes)),
            warnings = report.warnings.len(),
            "Build verification completed"
        );
        Ok(report)
    }
}

fn matching(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<Artifact>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let files = if recursive {
        walk_files(dir)
    } else {
        list_files(dir)
    }
    .map_err(|e| ForgeError::io_at(dir, e))?;

    let extensions = [extension.to_string()];
    Ok(files
        .into_iter()
        .filter(|p| has_extension(p, &extensions))
        .map(|path| {
            let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            Artifact { path, size_bytes }
        })
        .collect())
}
