//! ICU Forge Pipeline - ordered build steps for ICU static libraries
//!
//! Provides:
//! - A fail-fast step pipeline with panic capture at the step boundary
//! - Toolchain invocation and source acquisition behind traits
//! - The Cygwin configure and MSBuild native strategies

pub mod context;
pub mod env;
pub mod fakes;
pub mod invoker;
pub mod pipeline;
pub mod source;
pub mod step;
pub mod steps;
pub mod strategy;

// Re-export key types
pub use context::BuildContext;
pub use env::ToolchainEnv;
pub use invoker::{ExitOutcome, Invocation, ProcessInvoker, ToolchainInvoker};
pub use pipeline::{Pipeline, PipelineResult, StepFailure, StepRecord, StepStatus};
pub use source::{HttpSourceProvider, SourceProvider, DEFAULT_SOURCE_URL};
pub use step::{Phase, Step, StepAction, StepOutcome};
pub use steps::{ArtifactSearch, InvokeToolchain, SearchGroup};
pub use strategy::{assemble, strategy_for, BuildStrategy, ConfigureStrategy, NativeStrategy};
