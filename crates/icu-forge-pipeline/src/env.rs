//! Toolchain environment resolution.
//!
//! MSVC and the Windows SDK are located through environment variables a
//! developer prompt (or CI image) normally sets. None of them is required
//! up front: a missing variable is logged and the toolchain step that
//! needs it will fail on its own.

use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const VC_INSTALL_DIR: &str = "VCINSTALLDIR";
pub const WINDOWS_SDK_BIN_PATH: &str = "WindowsSdkBinPath";
pub const PATH: &str = "PATH";

/// Variables the toolchain steps consult.
pub const TOOLCHAIN_VARS: [&str; 3] = [VC_INSTALL_DIR, WINDOWS_SDK_BIN_PATH, PATH];

/// Resolved toolchain location variables, passed to every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnv {
    vars: BTreeMap<String, String>,
}

impl ToolchainEnv {
    /// Resolve [`TOOLCHAIN_VARS`] through `lookup`, warning for each one
    /// that is absent.
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = BTreeMap::new();
        for name in TOOLCHAIN_VARS {
            match lookup(name) {
                Some(value) if !value.is_empty() => {
                    debug!(var = name, "Toolchain variable resolved");
                    vars.insert(name.to_string(), value);
                }
                _ => warn!(var = name, "Toolchain variable not found in environment"),
            }
        }
        Self { vars }
    }

    /// Resolve from the current process environment.
    pub fn from_process() -> Self {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    pub fn vc_install_dir(&self) -> Option<&str> {
        self.vars.get(VC_INSTALL_DIR).map(String::as_str)
    }

    pub fn windows_sdk_bin_path(&self) -> Option<&str> {
        self.vars.get(WINDOWS_SDK_BIN_PATH).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// These variables with `extra` layered on top.
    pub fn merged(&self, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut vars = self.vars.clone();
        vars.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vars_are_not_errors() {
        let env = ToolchainEnv::resolve_with(|_| None);
        assert!(env.vars().is_empty());
        assert!(env.vc_install_dir().is_none());
    }

    #[test]
    fn test_resolves_present_vars() {
        let env = ToolchainEnv::resolve_with(|name| match name {
            VC_INSTALL_DIR => Some("C:\\VS\\VC\\".to_string()),
            WINDOWS_SDK_BIN_PATH => Some(String::new()),
            _ => None,
        });
        assert_eq!(env.vc_install_dir(), Some("C:\\VS\\VC\\"));
        assert!(env.windows_sdk_bin_path().is_none());
        assert_eq!(env.vars().len(), 1);
    }

    #[test]
    fn test_merged_overrides() {
        let env = ToolchainEnv::resolve_with(|name| Some(format!("{name}-value")));
        let mut extra = BTreeMap::new();
        extra.insert(PATH.to_string(), "override".to_string());
        extra.insert("CFLAGS".to_string(), "-MD".to_string());

        let merged = env.merged(&extra);
        assert_eq!(merged[PATH], "override");
        assert_eq!(merged["CFLAGS"], "-MD");
        assert_eq!(merged[VC_INSTALL_DIR], "VCINSTALLDIR-value");
    }
}
