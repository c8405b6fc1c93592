//! Main execution engine - runs pipelines stage by stage

use crate::{
    core::{
        BuildConfig, ExecutionStatus, Mode, PipelineKind, RunResult, SequenceResult, StageKind,
        StageState,
    },
    execution::{StageBuffer, StageExecutor},
    notifier::{Notifier, Reporter},
    tools::ToolRunner,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline: PipelineKind,
        mode: Mode,
    },
    StageStarted {
        pipeline: PipelineKind,
        stage: StageKind,
    },
    StageSkipped {
        pipeline: PipelineKind,
        stage: StageKind,
        reason: String,
    },
    StageCompleted {
        pipeline: PipelineKind,
        stage: StageKind,
        detail: Option<String>,
    },
    StageFailed {
        pipeline: PipelineKind,
        stage: StageKind,
        error: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        pipeline: PipelineKind,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine.
///
/// Shared between the build sequence and every watcher; each call to
/// [`ExecutionEngine::run_pipeline`] owns its own [`RunResult`].
pub struct ExecutionEngine<T> {
    executor: Arc<StageExecutor<T>>,
    reporter: Reporter,
    config: Arc<BuildConfig>,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<T: ToolRunner + 'static> ExecutionEngine<T> {
    pub fn new(tools: T, config: Arc<BuildConfig>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            executor: Arc::new(StageExecutor::new(tools, config.clone())),
            reporter: Reporter::new(notifier),
            config,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Run one pipeline to completion.
    ///
    /// Stages whose condition does not hold are recorded as skipped. The first
    /// failing stage is reported and ends the run; nothing propagates further.
    /// Finalizer stages (cleanup) still run after a failure when their
    /// condition holds, without clearing the failure.
    pub async fn run_pipeline(&self, pipeline: PipelineKind) -> RunResult {
        let mut run = RunResult::new(pipeline, self.config.mode);
        let flags = pipeline.flags(&self.config);

        info!("Starting {} pipeline ({})", pipeline, self.config.mode.as_str());
        self.emit_event(ExecutionEvent::PipelineStarted {
            run_id: run.run_id,
            pipeline,
            mode: run.mode,
        })
        .await;

        let mut buffer = StageBuffer::default();
        for stage in pipeline.stages() {
            if run.failed && !stage.kind.is_finalizer() {
                continue;
            }
            if !stage.condition.holds(&flags) {
                let reason = stage.condition.skip_reason().to_string();
                debug!("Skipping {} stage of {}: {}", stage.kind, pipeline, reason);
                run.record(
                    stage.kind,
                    StageState::Skipped {
                        reason: reason.clone(),
                    },
                );
                self.emit_event(ExecutionEvent::StageSkipped {
                    pipeline,
                    stage: stage.kind,
                    reason,
                })
                .await;
                continue;
            }

            self.emit_event(ExecutionEvent::StageStarted {
                pipeline,
                stage: stage.kind,
            })
            .await;

            let started_at = Utc::now();
            match self.executor.execute(pipeline, stage.kind, &mut buffer).await {
                Ok(detail) => {
                    run.record(
                        stage.kind,
                        StageState::Completed {
                            detail: detail.clone(),
                            started_at,
                            completed_at: Utc::now(),
                        },
                    );
                    self.emit_event(ExecutionEvent::StageCompleted {
                        pipeline,
                        stage: stage.kind,
                        detail,
                    })
                    .await;
                }
                Err(err) => {
                    run.record(
                        stage.kind,
                        StageState::Failed {
                            error: err.to_string(),
                            started_at,
                            failed_at: Utc::now(),
                        },
                    );
                    self.emit_event(ExecutionEvent::StageFailed {
                        pipeline,
                        stage: stage.kind,
                        error: err.to_string(),
                    })
                    .await;
                    if run.failed {
                        warn!("{} stage of failed {} run also failed: {}", stage.kind, pipeline, err);
                    } else {
                        self.reporter.notify_error(&mut run, &err);
                    }
                }
            }
        }

        self.reporter.notify_success(&run);
        run.finish();

        if run.failed {
            warn!("{} pipeline failed", pipeline);
        } else {
            info!("{} pipeline completed", pipeline);
        }
        self.emit_event(ExecutionEvent::PipelineCompleted {
            run_id: run.run_id,
            pipeline,
            status: run.status,
        })
        .await;

        run
    }

    /// Run pipelines one after another. A failed run never stops the sequence.
    pub async fn run_sequence(&self, pipelines: &[PipelineKind]) -> SequenceResult {
        let mut results = SequenceResult::default();
        for pipeline in pipelines {
            results.push(self.run_pipeline(*pipeline).await);
        }
        results
    }
}
