//! File watching: re-run a pipeline whenever its source tree changes

use crate::{
    core::{BuildConfig, PipelineKind},
    execution::ExecutionEngine,
    server::ReloadEvent,
    tools::ToolRunner,
};
use glob::{MatchOptions, Pattern};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to initialize file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("Failed to watch {path}: {source}")]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Nothing to watch for the {0} pipeline")]
    NoRoots(PipelineKind),
}

/// Which paths a pipeline's watcher observes
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub pipeline: PipelineKind,
    pub roots: Vec<PathBuf>,
    pub recursive: bool,
    pub patterns: Vec<Pattern>,
}

impl WatchSpec {
    pub fn for_pipeline(pipeline: PipelineKind, config: &BuildConfig) -> Result<Self, WatchError> {
        let (roots, recursive, patterns) = match pipeline {
            PipelineKind::Styles => (
                vec![config.styles.source_dir.clone()],
                true,
                &config.styles.watch_patterns,
            ),
            PipelineKind::Scripts => (
                vec![config.scripts.source_dir.clone()],
                true,
                &config.scripts.watch_patterns,
            ),
            PipelineKind::IconFont => (
                vec![config.icon_font.source_dir.clone()],
                false,
                &config.icon_font.watch_patterns,
            ),
            PipelineKind::Images => {
                let patterns = config
                    .images
                    .extensions
                    .iter()
                    .map(|ext| format!("*.{}", ext))
                    .collect::<Vec<_>>();
                return Ok(Self {
                    pipeline,
                    roots: vec![config.images.source_dir.clone()],
                    recursive: true,
                    patterns: compile_patterns(&patterns)?,
                });
            }
            PipelineKind::Tests => {
                let mut roots = vec![config.tests.suite_dir.clone()];
                if config.tests.source_dir.is_dir() {
                    roots.push(config.tests.source_dir.clone());
                }
                (roots, true, &config.tests.watch_patterns)
            }
        };

        Ok(Self {
            pipeline,
            roots,
            recursive,
            patterns: compile_patterns(patterns)?,
        })
    }

    /// Whether a changed path should trigger a rebuild
    pub fn is_relevant(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(name, options))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, WatchError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| WatchError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// A live debounced watcher for one pipeline
pub struct PipelineWatcher {
    spec: WatchSpec,
    events: mpsc::UnboundedReceiver<DebounceEventResult>,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl PipelineWatcher {
    /// Start watching. Roots that do not exist are skipped with a warning;
    /// having none left is an error.
    pub fn start(spec: WatchSpec, debounce: Duration) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            let _ = tx.send(result);
        })
        .map_err(WatchError::Init)?;

        let mode = if spec.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        let mut watched = 0;
        for root in &spec.roots {
            if !root.exists() {
                warn!("Not watching {}: path does not exist", root.display());
                continue;
            }
            debouncer
                .watcher()
                .watch(root, mode)
                .map_err(|source| WatchError::WatchPath {
                    path: root.clone(),
                    source,
                })?;
            watched += 1;
        }
        if watched == 0 {
            return Err(WatchError::NoRoots(spec.pipeline));
        }

        Ok(Self {
            spec,
            events: rx,
            _debouncer: debouncer,
        })
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    /// Re-run the pipeline on every relevant batch of changes until cancelled.
    /// Failed runs are reported by the engine and watching continues.
    pub async fn run<T: ToolRunner + 'static>(
        mut self,
        engine: Arc<ExecutionEngine<T>>,
        reload: Option<broadcast::Sender<ReloadEvent>>,
        cancel: CancellationToken,
    ) {
        let pipeline = self.spec.pipeline;
        for root in &self.spec.roots {
            info!("Watching {} for {} changes", root.display(), pipeline);
        }

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                batch = self.events.recv() => batch,
            };

            let events = match batch {
                Some(Ok(events)) => events,
                Some(Err(e)) => {
                    warn!("Watch error for {}: {:?}", pipeline, e);
                    continue;
                }
                None => break,
            };

            let changed: Vec<&Path> = events
                .iter()
                .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                .map(|e| e.path.as_path())
                .filter(|path| self.spec.is_relevant(path))
                .collect();
            if changed.is_empty() {
                continue;
            }
            for path in &changed {
                debug!("Changed: {}", path.display());
            }

            let run = engine.run_pipeline(pipeline).await;
            if run.failed {
                continue;
            }
            if let (Some(reload), Some(event)) = (&reload, ReloadEvent::for_pipeline(pipeline)) {
                // No connected browser is not an error
                let _ = reload.send(event);
            }
        }

        info!("Stopped watching {}", pipeline);
    }
}
