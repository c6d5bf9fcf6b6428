//! Error taxonomy for ICU Forge.

use std::path::PathBuf;

/// A mandatory condition the packaged output must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Postcondition {
    /// At least one static library under `lib/`.
    Libraries,
    /// At least one header under `include/`.
    Headers,
}

impl Postcondition {
    pub fn name(&self) -> &'static str {
        match self {
            Postcondition::Libraries => "libraries",
            Postcondition::Headers => "headers",
        }
    }
}

impl std::fmt::Display for Postcondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// ICU Forge errors.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("invalid {field}: {value:?} (expected one of: {expected})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("source acquisition failed: {0}")]
    SourceUnavailable(String),

    #[error("{label} exited with code {exit_code}: {stderr}")]
    Toolchain {
        label: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("required build input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("no library artifacts found in any candidate location")]
    NoLibraries,

    #[error("missing postconditions: {}", format_postconditions(.0))]
    MissingPostconditions(Vec<Postcondition>),

    #[error("step panicked: {0}")]
    StepPanicked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        ForgeError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}

fn format_postconditions(missing: &[Postcondition]) -> String {
    missing
        .iter()
        .map(Postcondition::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for ICU Forge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_postconditions_names_each() {
        let err = ForgeError::MissingPostconditions(vec![
            Postcondition::Libraries,
            Postcondition::Headers,
        ]);
        let msg = err.to_string();
        assert!(msg.contains("libraries"));
        assert!(msg.contains("headers"));
    }

    #[test]
    fn test_toolchain_error_display() {
        let err = ForgeError::Toolchain {
            label: "make install".to_string(),
            exit_code: 2,
            stderr: "No rule to make target".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("make install"));
        assert!(msg.contains("code 2"));
    }

    #[test]
    fn test_io_at_keeps_kind_and_path() {
        let err = ForgeError::io_at(
            std::path::Path::new("out/lib"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        match err {
            ForgeError::Io(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
                assert!(inner.to_string().contains("out/lib"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
