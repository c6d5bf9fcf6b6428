//! In-memory fakes for the collaborator traits (testing only)
//!
//! `FakeInvoker` records every toolchain call and answers with scripted exit
//! codes; `FakeSourceProvider` materialises an empty source tree instead of
//! downloading one.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use icu_forge_core::{BuildConfig, ForgeError, Result, Workspace};

use crate::invoker::{ExitOutcome, Invocation, ToolchainInvoker};
use crate::source::SourceProvider;

type Hook = Box<dyn Fn(&Invocation) + Send + Sync>;

// ---------------------------------------------------------------------------
// FakeInvoker
// ---------------------------------------------------------------------------

/// Records invocations; exits 0 unless an argument matches a scripted failure.
#[derive(Default)]
pub struct FakeInvoker {
    calls: Mutex<Vec<Invocation>>,
    failures: Vec<(String, i32)>,
    hook: Option<Hook>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `exit_code` when any argument contains `needle`.
    pub fn fail_when(mut self, needle: impl Into<String>, exit_code: i32) -> Self {
        self.failures.push((needle.into(), exit_code));
        self
    }

    /// Run `hook` on every invocation before it completes, e.g. to write
    /// the files a real build would produce.
    pub fn with_hook(mut self, hook: impl Fn(&Invocation) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl std::fmt::Debug for FakeInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeInvoker")
            .field("calls", &self.call_count())
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolchainInvoker for FakeInvoker {
    async fn invoke(
        &self,
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<ExitOutcome> {
        let invocation = Invocation {
            dir: dir.to_path_buf(),
            args: args.to_vec(),
            env: env.clone(),
        };
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some(hook) = &self.hook {
            hook(&invocation);
        }

        let failure = self
            .failures
            .iter()
            .find(|(needle, _)| invocation.mentions(needle));

        Ok(match failure {
            Some((needle, exit_code)) => ExitOutcome {
                exit_code: *exit_code,
                stdout: String::new(),
                stderr: format!("scripted failure on `{needle}`"),
                duration_ms: 0,
            },
            None => ExitOutcome {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 0,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// FakeSourceProvider
// ---------------------------------------------------------------------------

/// Creates the expected source directory and counts how often it was asked.
#[derive(Debug, Default)]
pub struct FakeSourceProvider {
    fetches: AtomicUsize,
    unavailable: bool,
}

impl FakeSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every fetch fails.
    pub fn unavailable() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            unavailable: true,
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for FakeSourceProvider {
    async fn fetch(&self, config: &BuildConfig, workspace: &Workspace) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ForgeError::SourceUnavailable(format!(
                "no route to source for {}",
                config.source_tag()
            )));
        }
        let dir = workspace.source_dir(config);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ForgeError::io_at(&dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icu_forge_core::{Architecture, DataPackaging, Flavor};

    #[tokio::test]
    async fn test_fake_invoker_scripts_failures() {
        let invoker = FakeInvoker::new().fail_when("MakeData", 1);
        let dir = tempfile::tempdir().unwrap();
        let env = BTreeMap::new();

        let ok = invoker
            .invoke(dir.path(), &["msbuild".to_string()], &env)
            .await
            .unwrap();
        let failed = invoker
            .invoke(
                dir.path(),
                &["msbuild".to_string(), "/target:MakeData".to_string()],
                &env,
            )
            .await
            .unwrap();

        assert!(ok.passed());
        assert_eq!(failed.exit_code, 1);
        assert_eq!(invoker.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fake_source_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(
            Architecture::X86,
            Flavor::Debuggable,
            DataPackaging::SeparateFile,
            "77.1",
            "release-77-1",
        )
        .unwrap();
        let ws = Workspace::new(dir.path(), &config);
        let provider = FakeSourceProvider::new();

        provider.fetch(&config, &ws).await.unwrap();

        assert!(ws.source_dir(&config).is_dir());
        assert_eq!(provider.fetch_count(), 1);
    }
}
