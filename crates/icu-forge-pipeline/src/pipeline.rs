//! Ordered, fail-fast step execution.

use crate::context::BuildContext;
use crate::step::{Step, StepOutcome};
use futures::FutureExt;
use icu_forge_core::ForgeError;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Final status of one executed step.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

/// Record of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    /// Skip reason or failure diagnostic.
    pub message: Option<String>,
}

/// The step that halted the pipeline and why.
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub error: ForgeError,
}

/// Result of a complete pipeline execution.
#[derive(Debug)]
pub struct PipelineResult {
    pub run_id: Uuid,

    /// Whether every step succeeded.
    pub success: bool,

    /// Steps that ran, in order. Steps after a failure are absent.
    pub steps: Vec<StepRecord>,

    /// Set when a step failed.
    pub failure: Option<StepFailure>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn passed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status != StepStatus::Failed)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Skipped)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.step.as_str())
    }
}

/// Runs an ordered sequence of steps against one build context.
pub struct Pipeline {
    ctx: BuildContext,
}

impl Pipeline {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Execute `steps` strictly in order.
    ///
    /// Stops at the first step that returns an error or panics; later steps
    /// are never started and earlier side effects are left in place.
    pub async fn run(&self, steps: Vec<Step>) -> PipelineResult {
        let start = Instant::now();
        let run_id = self.ctx.run_id;
        let total = steps.len();
        let mut records = Vec::with_capacity(total);
        let mut failure = None;

        info!(run_id = %run_id, steps = total, "Starting pipeline");

        for (index, step) in steps.iter().enumerate() {
            info!(
                step = %step.name(),
                phase = step.phase().name(),
                position = index + 1,
                of = total,
                "Executing step"
            );
            let step_start = Instant::now();

            let outcome = AssertUnwindSafe(step.action().run(&self.ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(ForgeError::StepPanicked(panic_message(payload))));
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(StepOutcome::Completed) => {
                    info!(step = %step.name(), duration_ms, "Step completed");
                    records.push(StepRecord {
                        name: step.name().to_string(),
                        status: StepStatus::Completed,
                        duration_ms,
                        message: None,
                    });
                }
                Ok(StepOutcome::CompletedWithWarnings(warnings)) => {
                    warn!(
                        step = %step.name(),
                        duration_ms,
                        warnings = warnings.len(),
                        "Step completed with warnings"
                    );
                    records.push(StepRecord {
                        name: step.name().to_string(),
                        status: StepStatus::Completed,
                        duration_ms,
                        message: Some(warnings.join("; ")),
                    });
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    info!(step = %step.name(), reason = %reason, "Step skipped");
                    records.push(StepRecord {
                        name: step.name().to_string(),
                        status: StepStatus::Skipped,
                        duration_ms,
                        message: Some(reason),
                    });
                }
                Err(e) => {
                    error!(step = %step.name(), error = %e, "Build failed at step");
                    records.push(StepRecord {
                        name: step.name().to_string(),
                        status: StepStatus::Failed,
                        duration_ms,
                        message: Some(e.to_string()),
                    });
                    failure = Some(StepFailure {
                        step: step.name().to_string(),
                        error: e,
                    });
                    break;
                }
            }
        }

        let success = failure.is_none();
        let duration_ms = start.elapsed().as_millis() as u64;
        if success {
            info!(run_id = %run_id, duration_ms, "Pipeline completed successfully");
        } else {
            info!(run_id = %run_id, duration_ms, "Pipeline failed");
        }

        PipelineResult {
            run_id,
            success,
            steps: records,
            failure,
            duration_ms,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: StepStatus) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            status,
            duration_ms: 10,
            message: None,
        }
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = PipelineResult {
            run_id: Uuid::new_v4(),
            success: true,
            steps: vec![
                record("Download ICU source", StepStatus::Skipped),
                record("Build ICU", StepStatus::Completed),
            ],
            failure: None,
            duration_ms: 20,
        };

        assert_eq!(result.passed_count(), 2);
        assert_eq!(result.skipped_count(), 1);
        assert!(result.failed_step().is_none());
    }

    #[test]
    fn test_pipeline_result_with_failure() {
        let result = PipelineResult {
            run_id: Uuid::new_v4(),
            success: false,
            steps: vec![
                record("Download ICU source", StepStatus::Completed),
                record("Configure build", StepStatus::Failed),
            ],
            failure: Some(StepFailure {
                step: "Configure build".to_string(),
                error: ForgeError::NoLibraries,
            }),
            duration_ms: 20,
        };

        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_step(), Some("Configure build"));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(7u8)), "non-string panic payload");
    }
}
