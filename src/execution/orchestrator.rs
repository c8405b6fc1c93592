//! Runs an execution plan: the build sequence, then the long-running fan-out

use crate::{
    core::SequenceResult,
    execution::{ExecutionEngine, ExecutionPlan, LongRunning},
    server::{DevServer, ReloadEvent, ServerError},
    tools::ToolRunner,
    watch::{PipelineWatcher, WatchError, WatchSpec},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long fan-out tasks get to stop after shutdown before being aborted
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const RELOAD_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

pub struct Orchestrator<T> {
    engine: Arc<ExecutionEngine<T>>,
}

impl<T: ToolRunner + 'static> Orchestrator<T> {
    pub fn new(engine: Arc<ExecutionEngine<T>>) -> Self {
        Self { engine }
    }

    /// Run the plan's sequence, then keep its server and watchers alive until
    /// `shutdown` is cancelled.
    ///
    /// Pipeline failures never surface as errors here; only a fan-out that
    /// cannot start does.
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        shutdown: CancellationToken,
    ) -> Result<SequenceResult, OrchestratorError> {
        let results = self.engine.run_sequence(&plan.sequence).await;
        if plan.is_one_shot() {
            return Ok(results);
        }

        let fanout = shutdown.child_token();
        let handles = match self.start_fanout(plan, &fanout).await {
            Ok(handles) => handles,
            Err(e) => {
                fanout.cancel();
                return Err(e);
            }
        };
        info!("{} long-running tasks started, press Ctrl-C to stop", handles.len());

        shutdown.cancelled().await;
        info!("Shutting down");
        join_with_grace(handles, SHUTDOWN_GRACE).await;

        Ok(results)
    }

    async fn start_fanout(
        &self,
        plan: &ExecutionPlan,
        fanout: &CancellationToken,
    ) -> Result<Vec<(String, JoinHandle<()>)>, OrchestratorError> {
        let config = self.engine.config();
        let (reload_tx, _) = broadcast::channel::<ReloadEvent>(RELOAD_CHANNEL_CAPACITY);
        let reload = plan.needs_server().then(|| reload_tx.clone());

        // Bind before starting watchers so an unusable port fails fast
        let server = if plan.needs_server() {
            Some(DevServer::bind(&config.server, reload_tx.clone(), fanout.child_token()).await?)
        } else {
            None
        };

        let mut watchers = Vec::new();
        for job in &plan.long_running {
            if let LongRunning::Watch(pipeline) = job {
                let spec = WatchSpec::for_pipeline(*pipeline, config)?;
                match PipelineWatcher::start(spec, Duration::from_millis(config.watch.debounce_ms)) {
                    Ok(watcher) => watchers.push(watcher),
                    Err(WatchError::NoRoots(pipeline)) => {
                        warn!("Not watching {}: none of its source trees exist", pipeline);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let mut handles = Vec::new();
        if let Some(server) = server {
            let token = fanout.child_token();
            handles.push((
                "dev-server".to_string(),
                tokio::spawn(async move {
                    if let Err(e) = server.run(token).await {
                        error!("{}", e);
                    }
                }),
            ));
        }
        for watcher in watchers {
            let name = format!("watch:{}", watcher.spec().pipeline);
            let task = watcher.run(self.engine.clone(), reload.clone(), fanout.child_token());
            handles.push((name, tokio::spawn(task)));
        }

        Ok(handles)
    }
}

/// Await every task for at most `grace`, aborting the ones still running
async fn join_with_grace(handles: Vec<(String, JoinHandle<()>)>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for (name, mut handle) in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => debug!("{} stopped", name),
            Ok(Err(e)) => warn!("{} ended abnormally: {}", name, e),
            Err(_) => {
                warn!("{} did not stop in time, aborting", name);
                handle.abort();
            }
        }
    }
}
