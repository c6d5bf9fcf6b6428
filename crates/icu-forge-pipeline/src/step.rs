//! Pipeline step definitions.

use crate::context::BuildContext;
use async_trait::async_trait;
use icu_forge_core::Result;
use serde::Serialize;

/// Position of a step in the fixed build shape.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AcquireSource,
    PrepareToolchain,
    Configure,
    Compile,
    Collect,
    Package,
    Verify,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::AcquireSource => "acquire_source",
            Phase::PrepareToolchain => "prepare_toolchain",
            Phase::Configure => "configure",
            Phase::Compile => "compile",
            Phase::Collect => "collect",
            Phase::Package => "package",
            Phase::Verify => "verify",
        }
    }
}

/// How a successful step finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work.
    Completed,
    /// The step did its work but found something worth reporting.
    CompletedWithWarnings(Vec<String>),
    /// The step found its output already present and did nothing.
    Skipped(String),
}

/// The work a step performs.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self, ctx: &BuildContext) -> Result<StepOutcome>;
}

/// A named, fallible unit of pipeline work.
pub struct Step {
    name: String,
    phase: Phase,
    action: Box<dyn StepAction>,
}

impl Step {
    pub fn new(name: impl Into<String>, phase: Phase, action: impl StepAction + 'static) -> Self {
        Self {
            name: name.into(),
            phase,
            action: Box::new(action),
        }
    }

    /// Human-readable label.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn action(&self) -> &dyn StepAction {
        self.action.as_ref()
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
