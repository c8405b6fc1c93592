//! CLI output formatting

use crate::{
    core::{ExecutionStatus, SequenceResult},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the build sequence
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline,
            mode,
        } => format!(
            "{} Starting {} ({}, {})",
            ROCKET,
            style(pipeline).bold(),
            mode.as_str(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted { pipeline, stage } => {
            format!("{} {}:{}", SPINNER, style(pipeline).dim(), style(stage).cyan())
        }
        ExecutionEvent::StageSkipped {
            pipeline,
            stage,
            reason,
        } => format!(
            "{} {}:{} ({})",
            SKIP,
            style(pipeline).dim(),
            style(stage).dim(),
            reason
        ),
        ExecutionEvent::StageCompleted {
            pipeline,
            stage,
            detail,
        } => match detail {
            Some(detail) => format!(
                "{} {}:{} {}",
                CHECK,
                style(pipeline).dim(),
                style(stage).green(),
                style(detail).dim()
            ),
            None => format!("{} {}:{}", CHECK, style(pipeline).dim(), style(stage).green()),
        },
        ExecutionEvent::StageFailed {
            pipeline,
            stage,
            error,
        } => format!(
            "{} {}:{}: {}",
            CROSS,
            style(pipeline).dim(),
            style(stage).red(),
            style(error).dim()
        ),
        ExecutionEvent::PipelineCompleted {
            run_id,
            pipeline,
            status,
        } => format!(
            "{} {} ({}) {}",
            INFO,
            style(pipeline).bold(),
            style(&run_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// One line per run of the sequence
pub fn format_sequence_summary(results: &SequenceResult) -> String {
    results
        .runs
        .iter()
        .map(|run| {
            let icon = if run.failed { CROSS } else { CHECK };
            let elapsed = run
                .completed_at
                .and_then(|done| done.signed_duration_since(run.started_at).to_std().ok())
                .map(format_duration)
                .unwrap_or_default();
            format!(
                "  {}{:<10} {} {}",
                icon,
                run.pipeline.label(),
                format_status(run.status),
                style(elapsed).dim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
