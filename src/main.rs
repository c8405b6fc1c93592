use anyhow::{Context, Result};
use assetflow::cli::output::*;
use assetflow::cli::{Cli, Command};
use assetflow::core::config::ProjectConfig;
use assetflow::core::{BuildConfig, Mode};
use assetflow::execution::{ExecutionEngine, ExecutionEvent, ExecutionPlan, Orchestrator};
use assetflow::notifier::{CommandNotifier, ConsoleNotifier, MultiNotifier, Notifier};
use assetflow::tools::SubprocessToolRunner;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let (project, root) = ProjectConfig::discover(cli.config.as_deref())
        .context("Failed to load project config")?;
    let root = root
        .canonicalize()
        .with_context(|| format!("Project root {} is not accessible", root.display()))?;
    let mode = Mode::from_dev_flag(cli.dev);
    let config = Arc::new(BuildConfig::resolve(mode, &project, &root));

    if let Some(Command::Config(cmd)) = &cli.command {
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(config.as_ref())?);
        } else {
            print!("{}", serde_yaml::to_string(config.as_ref())?);
        }
        return Ok(());
    }

    let Some(task) = cli.task() else {
        return Ok(());
    };
    let plan = ExecutionPlan::for_task(task);
    config
        .validate_inputs(&plan.startup_pipelines())
        .context("Cannot start build")?;

    run_plan(config, plan).await
}

async fn run_plan(config: Arc<BuildConfig>, plan: ExecutionPlan) -> Result<()> {
    println!(
        "{} {} mode, project {}",
        INFO,
        style(config.mode.as_str()).bold(),
        style(config.root.display()).dim()
    );

    let mut notifier = MultiNotifier::new().with(Arc::new(ConsoleNotifier));
    if let Some(command) = &config.notifications.desktop_command {
        notifier = notifier.with(Arc::new(CommandNotifier::new(command.clone())));
    }
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    let tools = SubprocessToolRunner::new(config.tools.clone(), config.root.clone());
    let engine = Arc::new(ExecutionEngine::new(tools, config.clone(), notifier));

    // Set up event handler for console output
    let progress = (!plan.sequence.is_empty()).then(|| create_progress_bar(plan.sequence.len()));
    let bar = progress.clone();
    engine
        .add_event_handler(move |event| {
            let line = format_execution_event(&event);
            match &bar {
                Some(bar) if !bar.is_finished() => {
                    bar.suspend(|| println!("{}", line));
                    if let ExecutionEvent::PipelineCompleted { pipeline, .. } = &event {
                        bar.inc(1);
                        bar.set_message(pipeline.label());
                        // Watcher re-runs after the sequence print plainly
                        if Some(bar.position()) == bar.length() {
                            bar.finish_and_clear();
                        }
                    }
                }
                _ => println!("{}", line),
            }
        })
        .await;

    // One-shot plans keep the default Ctrl-C behavior
    let shutdown = CancellationToken::new();
    if !plan.is_one_shot() {
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
    }

    let orchestrator = Orchestrator::new(engine);
    let results = orchestrator
        .run(&plan, shutdown)
        .await
        .context("Failed to start server or watchers")?;
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if !results.runs.is_empty() {
        println!("\n{} Build summary", INFO);
        println!("{}", format_sequence_summary(&results));
    }
    if results.failed() {
        let failed: Vec<_> = results
            .failed_pipelines()
            .iter()
            .map(|p| p.label())
            .collect();
        error!("Failed pipelines: {}", failed.join(", "));
        println!(
            "{} {} failed, see the errors above",
            WARN,
            style(failed.join(", ")).red()
        );
    } else if !plan.sequence.is_empty() {
        println!("{} Build {}", CHECK, style("succeeded").green());
    }

    Ok(())
}
