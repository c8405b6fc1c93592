//! Success/failure reporting for pipeline runs

use crate::core::{PipelineError, PipelineKind, RunResult};
use crate::tools::CommandSpec;
use console::{style, Emoji};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tracing::{debug, error, warn};

static SUCCESS: Emoji<'_, '_> = Emoji("🎉 ", "+ ");
static FAILURE: Emoji<'_, '_> = Emoji("💥 ", "! ");

pub const SUCCESS_TITLE: &str = "Yaaay!";
pub const ERROR_TITLE: &str = "Ooops...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A user-facing notice about one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub pipeline: PipelineKind,
}

impl Notification {
    pub fn success(pipeline: PipelineKind) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: SUCCESS_TITLE.to_string(),
            message: pipeline.success_message().to_string(),
            pipeline,
        }
    }

    pub fn error(pipeline: PipelineKind) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: ERROR_TITLE.to_string(),
            message: pipeline.error_message().to_string(),
            pipeline,
        }
    }
}

/// A notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Prints a styled line to the terminal
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        let line = match notification.level {
            NotificationLevel::Success => format!(
                "{}{} {} {}",
                SUCCESS,
                style(&notification.title).green().bold(),
                style(format!("[{}]", notification.pipeline)).dim(),
                notification.message
            ),
            NotificationLevel::Error => format!(
                "{}{} {} {}",
                FAILURE,
                style(&notification.title).red().bold(),
                style(format!("[{}]", notification.pipeline)).dim(),
                style(&notification.message).red()
            ),
        };
        println!("{}", line);
    }
}

/// Runs a desktop notification command such as `notify-send`.
///
/// The command runs on the ambient tokio runtime and is reaped there; a
/// missing binary only logs a warning.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: CommandSpec,
}

impl CommandNotifier {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, notification: &Notification) {
        let vars = HashMap::from([
            ("title".to_string(), notification.title.clone()),
            ("message".to_string(), notification.message.clone()),
            ("pipeline".to_string(), notification.pipeline.label().to_string()),
        ]);
        let rendered = self.command.render(&vars);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Desktop notification via {} skipped: no async runtime",
                rendered.program
            );
            return;
        };

        handle.spawn(async move {
            let spawned = tokio::process::Command::new(&rendered.program)
                .args(&rendered.args)
                .envs(rendered.env)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(false)
                .spawn();

            match spawned {
                Ok(mut child) => {
                    if let Err(e) = child.wait().await {
                        debug!("Desktop notification via {} not reaped: {}", rendered.program, e);
                    }
                }
                Err(e) => warn!("Desktop notification via {} failed: {}", rendered.program, e),
            }
        });
    }
}

/// Fans one notification out to several sinks
#[derive(Default, Clone)]
pub struct MultiNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Notifier for MultiNotifier {
    fn notify(&self, notification: &Notification) {
        for sink in &self.sinks {
            sink.notify(notification);
        }
    }
}

/// Applies the reporting rules to a run
#[derive(Clone)]
pub struct Reporter {
    notifier: Arc<dyn Notifier>,
}

impl Reporter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Emit the success notice unless a stage of this run failed.
    /// Returns whether a notice went out.
    pub fn notify_success(&self, run: &RunResult) -> bool {
        if run.failed {
            debug!("Suppressing success notice for failed {} run", run.pipeline);
            return false;
        }
        self.notifier.notify(&Notification::success(run.pipeline));
        true
    }

    /// Mark the run failed, log the raw error and emit the pipeline's error notice
    pub fn notify_error(&self, run: &mut RunResult, err: &PipelineError) {
        run.mark_failed();
        error!(pipeline = %run.pipeline, run_id = %run.run_id, "{}", err);
        self.notifier.notify(&Notification::error(run.pipeline));
    }
}
