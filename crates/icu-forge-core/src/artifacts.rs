//! Artifact discovery.
//!
//! Toolchain versions and build strategies drop their outputs in different
//! places. [`ArtifactLocator`] searches an ordered list of candidate
//! directories and collects whatever matches, skipping directories that do
//! not exist.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of file produced by the toolchain.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Static library (`.lib`).
    Library,
    /// Tool executable (`.exe`).
    Executable,
    /// Standalone data file (`.dat`).
    Data,
    /// Public header (`.h`).
    Header,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Library,
        ArtifactKind::Executable,
        ArtifactKind::Data,
        ArtifactKind::Header,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Library => "library",
            ArtifactKind::Executable => "executable",
            ArtifactKind::Data => "data",
            ArtifactKind::Header => "header",
        }
    }

    /// Subdirectory of the canonical layout this kind is packaged into.
    pub fn layout_dir(&self) -> &'static str {
        match self {
            ArtifactKind::Library => "lib",
            ArtifactKind::Executable => "bin",
            ArtifactKind::Data => "data",
            ArtifactKind::Header => "include/unicode",
        }
    }
}

/// A discovered file and its size at discovery time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Discovered artifacts grouped by kind, in discovery order.
///
/// Empty groups are a valid state; callers decide which kinds are mandatory.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ArtifactSet {
    entries: BTreeMap<ArtifactKind, Vec<Artifact>>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ArtifactKind, artifact: Artifact) {
        self.entries.entry(kind).or_default().push(artifact);
    }

    /// Artifacts of one kind, empty if none were found.
    pub fn get(&self, kind: ArtifactKind) -> &[Artifact] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.get(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn total_bytes(&self, kind: ArtifactKind) -> u64 {
        self.get(kind).iter().map(|a| a.size_bytes).sum()
    }

    /// Append every artifact of `other`, keeping order.
    pub fn extend(&mut self, other: ArtifactSet) {
        for (kind, artifacts) in other.entries {
            self.entries.entry(kind).or_default().extend(artifacts);
        }
    }

    /// Iterate `(kind, artifact)` pairs, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &Artifact)> {
        self.entries
            .iter()
            .flat_map(|(kind, artifacts)| artifacts.iter().map(move |a| (*kind, a)))
    }
}

/// Matches files of one kind by extension (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    pub kind: ArtifactKind,
    pub extensions: Vec<String>,
}

impl ArtifactPattern {
    pub fn new(kind: ArtifactKind, extensions: &[&str]) -> Self {
        Self {
            kind,
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn library() -> Self {
        Self::new(ArtifactKind::Library, &["lib"])
    }

    pub fn executable() -> Self {
        Self::new(ArtifactKind::Executable, &["exe"])
    }

    pub fn data() -> Self {
        Self::new(ArtifactKind::Data, &["dat"])
    }

    pub fn header() -> Self {
        Self::new(ArtifactKind::Header, &["h"])
    }

    pub fn matches(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }
}

/// Searches candidate directories for artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    patterns: Vec<ArtifactPattern>,
}

impl ArtifactLocator {
    pub fn new(patterns: Vec<ArtifactPattern>) -> Self {
        Self { patterns }
    }

    /// Collect matching files from each existing candidate, in candidate
    /// order. Missing candidates are skipped; a candidate listed twice is
    /// visited once. Files with the same name under different candidates
    /// are all kept.
    pub fn locate(&self, candidates: &[PathBuf]) -> ArtifactSet {
        let mut set = ArtifactSet::new();
        let mut visited = HashSet::new();

        for candidate in candidates {
            if !visited.insert(normalize(candidate)) {
                continue;
            }
            if !candidate.is_dir() {
                debug!(path = %candidate.display(), "Candidate not present, skipping");
                continue;
            }

            let files = match list_files(candidate) {
                Ok(files) => files,
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "Unreadable candidate, skipping");
                    continue;
                }
            };

            for pattern in &self.patterns {
                let mut found = 0usize;
                for path in files.iter().filter(|p| pattern.matches(p)) {
                    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    set.push(
                        pattern.kind,
                        Artifact {
                            path: path.clone(),
                            size_bytes,
                        },
                    );
                    found += 1;
                }
                if found > 0 {
                    debug!(
                        path = %candidate.display(),
                        kind = pattern.kind.name(),
                        count = found,
                        "Found artifacts"
                    );
                }
            }
        }

        set
    }
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Regular files under `dir` at any depth (no external dependency).
pub fn walk_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .map(|e| e.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();
        for path in entries {
            if path.is_dir() {
                files.extend(walk_files(&path)?);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}

pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// Lexically resolve `.` and `..` so `a/b/../c` and `a/c` count as one path.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn locator() -> ArtifactLocator {
        ArtifactLocator::new(vec![
            ArtifactPattern::library(),
            ArtifactPattern::executable(),
            ArtifactPattern::data(),
        ])
    }

    #[test]
    fn test_no_existing_candidates_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![dir.path().join("missing"), dir.path().join("also/missing")];

        let set = locator().locate(&candidates);
        assert!(set.is_empty());
        for kind in ArtifactKind::ALL {
            assert_eq!(set.count(kind), 0);
        }
    }

    #[test]
    fn test_empty_candidate_list() {
        assert!(locator().locate(&[]).is_empty());
    }

    #[test]
    fn test_same_name_in_two_candidates_is_kept_twice() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("lib64");
        let b = dir.path().join("lib");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("icuuc.lib"), b"aaaa").unwrap();
        fs::write(b.join("icuuc.lib"), b"bb").unwrap();

        let set = locator().locate(&[a.clone(), b.clone()]);
        let libs = set.get(ArtifactKind::Library);
        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0].path, a.join("icuuc.lib"));
        assert_eq!(libs[0].size_bytes, 4);
        assert_eq!(libs[1].path, b.join("icuuc.lib"));
        assert_eq!(set.total_bytes(ArtifactKind::Library), 6);
    }

    #[test]
    fn test_candidate_visited_once() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("icuin.lib"), b"x").unwrap();

        let alias = dir.path().join("lib").join("..").join("lib");
        let set = locator().locate(&[lib.clone(), alias, lib]);
        assert_eq!(set.count(ArtifactKind::Library), 1);
    }

    #[test]
    fn test_leading_parent_dirs_are_kept() {
        assert_eq!(normalize(Path::new("../../lib")), PathBuf::from("../../lib"));
        assert_eq!(normalize(Path::new("a/../../lib")), PathBuf::from("../lib"));
        assert_eq!(normalize(Path::new("./a/b/../c")), PathBuf::from("a/c"));
        assert_ne!(normalize(Path::new("../../lib")), normalize(Path::new("lib")));
    }

    #[test]
    fn test_relative_candidates_above_and_below_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("lib");
        let nested = dir.path().join("a").join("b");
        let inner = nested.join("lib");
        fs::create_dir_all(&outer).unwrap();
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join("outer.lib"), b"o").unwrap();
        fs::write(inner.join("inner.lib"), b"i").unwrap();

        // Same shape as `../../lib` and `lib` resolved from `a/b`.
        let above = nested.join("..").join("..").join("lib");
        let set = locator().locate(&[above, inner]);

        let names: Vec<String> = set
            .get(ArtifactKind::Library)
            .iter()
            .map(|a| a.file_name())
            .collect();
        assert_eq!(names, vec!["outer.lib", "inner.lib"]);
    }

    #[test]
    fn test_kinds_are_sorted_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bin64");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("icuuc.lib"), b"").unwrap();
        fs::write(out.join("genrb.exe"), b"").unwrap();
        fs::write(out.join("ICUDT77L.DAT"), b"").unwrap();
        fs::write(out.join("readme.txt"), b"").unwrap();
        fs::create_dir_all(out.join("nested.lib")).unwrap();

        let set = locator().locate(&[out]);
        assert_eq!(set.count(ArtifactKind::Library), 1);
        assert_eq!(set.count(ArtifactKind::Executable), 1);
        assert_eq!(set.count(ArtifactKind::Data), 1);
        assert_eq!(set.count(ArtifactKind::Header), 0);
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut first = ArtifactSet::new();
        first.push(
            ArtifactKind::Library,
            Artifact {
                path: PathBuf::from("a.lib"),
                size_bytes: 1,
            },
        );
        let mut second = ArtifactSet::new();
        second.push(
            ArtifactKind::Library,
            Artifact {
                path: PathBuf::from("b.lib"),
                size_bytes: 2,
            },
        );

        first.extend(second);
        let names: Vec<_> = first
            .get(ArtifactKind::Library)
            .iter()
            .map(Artifact::file_name)
            .collect();
        assert_eq!(names, vec!["a.lib", "b.lib"]);
    }

    #[test]
    fn test_walk_files_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("unicode")).unwrap();
        fs::write(dir.path().join("unicode").join("utypes.h"), b"").unwrap();
        fs::write(dir.path().join("top.h"), b"").unwrap();

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(walk_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
