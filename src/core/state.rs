//! Execution state models

use crate::core::{config::Mode, pipeline::PipelineKind, stage::StageKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run is in progress
    Running,
    /// Every active stage completed
    Completed,
    /// A stage failed and the run ended early
    Failed,
}

/// Outcome of a single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageState {
    /// Stage condition did not hold in this mode
    Skipped {
        reason: String,
    },
    /// Stage completed successfully
    Completed {
        detail: Option<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Stage failed, ending the run
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageKind,
    pub state: StageState,
}

/// Result of one pipeline run.
///
/// Each run starts from a fresh value, so a failure never leaks into the
/// next independent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub pipeline: PipelineKind,
    pub mode: Mode,
    pub status: ExecutionStatus,
    /// Set when any stage of this run failed
    pub failed: bool,
    pub stages: Vec<StageRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunResult {
    pub fn new(pipeline: PipelineKind, mode: Mode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline,
            mode,
            status: ExecutionStatus::Running,
            failed: false,
            stages: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn record(&mut self, stage: StageKind, state: StageState) {
        self.stages.push(StageRecord { stage, state });
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Close the run, deriving the final status from the failure flag
    pub fn finish(&mut self) {
        self.status = if self.failed {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };
        self.completed_at = Some(Utc::now());
    }

    pub fn stage_state(&self, stage: StageKind) -> Option<&StageState> {
        self.stages
            .iter()
            .find(|record| record.stage == stage)
            .map(|record| &record.state)
    }

    /// Stages that actually ran to completion, in order
    pub fn completed_stages(&self) -> Vec<StageKind> {
        self.stages
            .iter()
            .filter(|record| matches!(record.state, StageState::Completed { .. }))
            .map(|record| record.stage)
            .collect()
    }

    pub fn skipped_stages(&self) -> Vec<StageKind> {
        self.stages
            .iter()
            .filter(|record| matches!(record.state, StageState::Skipped { .. }))
            .map(|record| record.stage)
            .collect()
    }

    /// Error message of the failed stage, if any
    pub fn error(&self) -> Option<&str> {
        self.stages.iter().find_map(|record| match &record.state {
            StageState::Failed { error, .. } => Some(error.as_str()),
            _ => None,
        })
    }
}

/// Aggregated results of a sequence of pipeline runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceResult {
    pub runs: Vec<RunResult>,
}

impl SequenceResult {
    pub fn push(&mut self, run: RunResult) {
        self.runs.push(run);
    }

    pub fn failed(&self) -> bool {
        self.runs.iter().any(|run| run.failed)
    }

    pub fn failed_pipelines(&self) -> Vec<PipelineKind> {
        self.runs
            .iter()
            .filter(|run| run.failed)
            .map(|run| run.pipeline)
            .collect()
    }

    /// Pipelines in the order they ran
    pub fn order(&self) -> Vec<PipelineKind> {
        self.runs.iter().map(|run| run.pipeline).collect()
    }
}
