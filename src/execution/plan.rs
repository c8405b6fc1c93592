//! Task to execution plan mapping

use crate::core::{PipelineKind, DEFAULT_SEQUENCE};
use serde::Serialize;

/// A named unit the user can ask for on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Build everything, then serve and watch
    Default,
    /// Build everything once
    Build,
    /// Run a single pipeline once
    Run(PipelineKind),
    /// Run a pipeline once, then re-run it on every change
    Watch(PipelineKind),
    /// Serve the production root with live reload
    Serve,
}

/// Jobs that keep running until shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LongRunning {
    DevServer,
    Watch(PipelineKind),
}

/// What a task does: a sequential build followed by an optional fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub sequence: Vec<PipelineKind>,
    pub long_running: Vec<LongRunning>,
}

impl ExecutionPlan {
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Default => {
                let mut long_running = vec![LongRunning::DevServer];
                long_running.extend(PipelineKind::ALL.iter().map(|p| LongRunning::Watch(*p)));
                Self {
                    sequence: DEFAULT_SEQUENCE.to_vec(),
                    long_running,
                }
            }
            Task::Build => Self {
                sequence: DEFAULT_SEQUENCE.to_vec(),
                long_running: Vec::new(),
            },
            Task::Run(pipeline) => Self {
                sequence: vec![pipeline],
                long_running: Vec::new(),
            },
            Task::Watch(pipeline) => Self {
                sequence: vec![pipeline],
                long_running: vec![LongRunning::Watch(pipeline)],
            },
            Task::Serve => Self {
                sequence: Vec::new(),
                long_running: vec![LongRunning::DevServer],
            },
        }
    }

    /// Pipelines whose inputs must exist before anything runs: the build
    /// sequence, in order. Watchers over missing trees are skipped at fan-out.
    pub fn startup_pipelines(&self) -> Vec<PipelineKind> {
        let mut pipelines: Vec<PipelineKind> = Vec::new();
        for pipeline in &self.sequence {
            if !pipelines.contains(pipeline) {
                pipelines.push(*pipeline);
            }
        }
        pipelines
    }

    pub fn needs_server(&self) -> bool {
        self.long_running.contains(&LongRunning::DevServer)
    }

    pub fn is_one_shot(&self) -> bool {
        self.long_running.is_empty()
    }
}
