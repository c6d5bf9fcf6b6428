//! Canonical artifact layout and archive creation.
//!
//! Layout of a packaged bundle:
//!
//! ```text
//! <name>/
//!   lib/               static libraries
//!   include/unicode/   public headers
//!   bin/               tool executables
//!   data/              standalone .dat files (separate data packaging)
//!   BUILD_INFO.txt     manifest
//! <name>.tar.gz        the tree above, paths relative to <name>/
//! <name>.tar.gz.sha256
//! ```

use crate::artifacts::{ArtifactKind, ArtifactSet};
use crate::config::{BuildConfig, DataPackaging, StrategyKind};
use crate::error::{ForgeError, Result};
use crate::manifest::Manifest;
use crate::workspace::MANIFEST_FILE;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a successful packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedBundle {
    /// Canonical directory.
    pub dir: PathBuf,
    /// Compressed archive of `dir`.
    pub archive: PathBuf,
    /// SHA-256 of the archive, hex encoded.
    pub archive_sha256: String,
    /// Number of files copied into the layout (manifest excluded).
    pub files: usize,
}

/// Assembles the canonical layout and archives it.
#[derive(Debug, Clone)]
pub struct ArtifactPackager {
    strategy: StrategyKind,
    run_id: Uuid,
}

impl ArtifactPackager {
    pub fn new(strategy: StrategyKind, run_id: Uuid) -> Self {
        Self { strategy, run_id }
    }

    /// Package `set` into `<destination>/<artifact name>` and archive it.
    ///
    /// Fails without touching the filesystem when `set` holds no libraries.
    /// An existing directory of the same name is deleted first.
    pub fn package(
        &self,
        set: &ArtifactSet,
        config: &BuildConfig,
        destination: &Path,
    ) -> Result<PackagedBundle> {
        if set.count(ArtifactKind::Library) == 0 {
            return Err(ForgeError::NoLibraries);
        }

        let name = config.artifact_name();
        let dir = destination.join(&name);
        let archive = destination.join(format!("{name}.tar.gz"));

        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| ForgeError::io_at(&dir, e))?;
        }
        let mut layout = vec![
            ArtifactKind::Library,
            ArtifactKind::Header,
            ArtifactKind::Executable,
        ];
        if config.data_packaging() == DataPackaging::SeparateFile {
            layout.push(ArtifactKind::Data);
        }
        for kind in layout {
            let sub = dir.join(kind.layout_dir());
            fs::create_dir_all(&sub).map_err(|e| ForgeError::io_at(&sub, e))?;
        }

        // The first candidate to supply a file name wins.
        let mut written = HashSet::new();
        for (kind, artifact) in set.iter() {
            let target_dir = dir.join(kind.layout_dir());
            fs::create_dir_all(&target_dir).map_err(|e| ForgeError::io_at(&target_dir, e))?;
            let target = target_dir.join(artifact.file_name());
            if !written.insert(target.clone()) {
                warn!(
                    kind = kind.name(),
                    skipped = %artifact.path.display(),
                    target = %target.display(),
                    "Duplicate artifact name, keeping the first located file"
                );
                continue;
            }
            fs::copy(&artifact.path, &target).map_err(|e| ForgeError::io_at(&artifact.path, e))?;

            if kind != ArtifactKind::Header {
                info!(
                    kind = kind.name(),
                    file = %artifact.file_name(),
                    size_mb = format!("{:.2}", megabytes(artifact.size_bytes)),
                    "Packaged artifact"
                );
            }
        }
        info!(
            headers = set.count(ArtifactKind::Header),
            "Packaged headers"
        );

        let manifest_path = dir.join(MANIFEST_FILE);
        Manifest::new(self.run_id, self.strategy, config.clone())
            .write_to(&manifest_path)
            .map_err(|e| ForgeError::io_at(&manifest_path, e))?;

        write_archive(&dir, &archive, destination)?;
        let archive_sha256 = sha256_file(&archive)?;
        let digest_path = PathBuf::from(format!("{}.sha256", archive.display()));
        fs::write(&digest_path, format!("{archive_sha256}  {name}.tar.gz\n"))
            .map_err(|e| ForgeError::io_at(&digest_path, e))?;

        info!(archive = %archive.display(), sha256 = %archive_sha256, "Artifacts packaged");

        Ok(PackagedBundle {
            dir,
            archive,
            archive_sha256,
            files: written.len(),
        })
    }
}

/// Write a gzip'd tar of `tree` to `archive`, entries relative to `tree`.
///
/// The archive is written to a temporary file in `scratch_dir` and renamed
/// into place, so a failed run never leaves a truncated archive behind.
fn write_archive(tree: &Path, archive: &Path, scratch_dir: &Path) -> Result<()> {
    let tmp = NamedTempFile::new_in(scratch_dir)?;
    {
        let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.mode(tar::HeaderMode::Deterministic);
        append_tree(&mut builder, tree, tree)?;
        let encoder = builder.into_inner()?;
        encoder.finish()?.flush()?;
    }
    tmp.persist(archive)
        .map_err(|e| ForgeError::io_at(archive, e.error))?;
    Ok(())
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, root: &Path, dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if path.is_dir() {
            builder.append_dir(relative, &path)?;
            append_tree(builder, root, &path)?;
        } else {
            builder.append_path_with_name(&path, relative)?;
        }
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| ForgeError::io_at(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
