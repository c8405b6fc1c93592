//! Sequencing and the long-running fan-out

use crate::helpers::*;
use assetflow::core::config::ProjectConfig;
use assetflow::core::{BuildConfig, Mode, PipelineKind, DEFAULT_SEQUENCE};
use assetflow::execution::{
    ExecutionEngine, ExecutionPlan, Orchestrator, OrchestratorError, Task,
};
use assetflow::tools::ToolKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

const TEST_TIMEOUT: Duration = Duration::from_secs(15);

fn fast_local(project: &mut ProjectConfig) {
    project.server.port = 0;
    project.watch.debounce_ms = 50;
}

fn orchestrator(
    config: Arc<BuildConfig>,
    tools: &MockTools,
    notifier: &Arc<RecordingNotifier>,
) -> Orchestrator<MockTools> {
    let engine = ExecutionEngine::new(tools.clone(), config, notifier.clone());
    Orchestrator::new(Arc::new(engine))
}

#[tokio::test]
async fn test_build_runs_default_sequence_in_order() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(project.config(Mode::Production), &tools, &notifier);

    let results = orchestrator
        .run(&ExecutionPlan::for_task(Task::Build), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.order(), DEFAULT_SEQUENCE.to_vec());
    assert!(!results.failed());
    assert_eq!(
        notifier.successes(),
        vec![
            "Images Optimized Successfully!",
            "Icon Font Compiled Successfully!",
            "CSS Compiled Successfully!",
            "JS Compiled Successfully!",
        ]
    );
    assert_eq!(tools.count(ToolKind::SpecRunner), 0);
    assert!(project.exists("public/css/styles.css"));
    assert!(project.exists("public/js/scripts.js"));
}

#[tokio::test]
async fn test_icon_stylesheet_is_ready_before_styles_compile() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(project.config(Mode::Dev), &tools, &notifier);

    orchestrator
        .run(&ExecutionPlan::for_task(Task::Build), CancellationToken::new())
        .await
        .unwrap();

    let kinds: Vec<ToolKind> = tools.calls().iter().map(|call| call.kind()).collect();
    let generator = kinds
        .iter()
        .position(|k| *k == ToolKind::IconFontGenerator)
        .unwrap();
    let compiler = kinds
        .iter()
        .position(|k| *k == ToolKind::StyleCompiler)
        .unwrap();
    assert!(generator < compiler);
}

#[tokio::test]
async fn test_failed_pipeline_does_not_stop_sequence() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    tools.fail(ToolKind::StyleCompiler);
    let orchestrator = orchestrator(project.config(Mode::Production), &tools, &notifier);

    let results = orchestrator
        .run(&ExecutionPlan::for_task(Task::Build), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.runs.len(), 4);
    assert_eq!(results.failed_pipelines(), vec![PipelineKind::Styles]);
    assert!(project.exists("public/js/scripts.js"));
    assert_eq!(notifier.errors(), vec!["Error compiling SASS!"]);
    assert_eq!(notifier.successes().len(), 3);
}

#[tokio::test]
async fn test_watch_rebuilds_on_change_until_shutdown() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(
        project.config_with(Mode::Dev, fast_local),
        &tools,
        &notifier,
    );
    let plan = ExecutionPlan::for_task(Task::Watch(PipelineKind::Styles));
    let shutdown = CancellationToken::new();

    let driver = async {
        while tools.count(ToolKind::StyleCompiler) < 1 {
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(300)).await;
        project.write("assets/sass/_grid.scss", ".grid { display: flex; }");

        let deadline = Instant::now() + Duration::from_secs(10);
        while tools.count(ToolKind::StyleCompiler) < 2 && Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }
        shutdown.cancel();
    };

    let (results, _) = timeout(
        TEST_TIMEOUT,
        async { tokio::join!(orchestrator.run(&plan, shutdown.clone()), driver) },
    )
    .await
    .expect("orchestrator did not shut down");

    let results = results.unwrap();
    assert_eq!(results.runs.len(), 1);
    assert!(tools.count(ToolKind::StyleCompiler) >= 2);
    assert!(notifier.successes().len() >= 2);
}

#[tokio::test]
async fn test_irrelevant_changes_do_not_rebuild() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(
        project.config_with(Mode::Dev, fast_local),
        &tools,
        &notifier,
    );
    let plan = ExecutionPlan::for_task(Task::Watch(PipelineKind::Styles));
    let shutdown = CancellationToken::new();

    let driver = async {
        while tools.count(ToolKind::StyleCompiler) < 1 {
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(300)).await;
        project.write("assets/sass/README.md", "notes");
        sleep(Duration::from_millis(600)).await;
        shutdown.cancel();
    };

    let (results, _) = timeout(
        TEST_TIMEOUT,
        async { tokio::join!(orchestrator.run(&plan, shutdown.clone()), driver) },
    )
    .await
    .expect("orchestrator did not shut down");

    assert!(results.is_ok());
    assert_eq!(tools.count(ToolKind::StyleCompiler), 1);
}

#[tokio::test]
async fn test_default_task_fans_out_and_stops_on_shutdown() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(
        project.config_with(Mode::Dev, fast_local),
        &tools,
        &notifier,
    );
    let plan = ExecutionPlan::for_task(Task::Default);
    let shutdown = CancellationToken::new();

    let driver = async {
        while notifier.all().len() < DEFAULT_SEQUENCE.len() {
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    };

    let (results, _) = timeout(
        TEST_TIMEOUT,
        async { tokio::join!(orchestrator.run(&plan, shutdown.clone()), driver) },
    )
    .await
    .expect("orchestrator did not shut down");

    let results = results.unwrap();
    assert_eq!(results.order(), DEFAULT_SEQUENCE.to_vec());
    assert_eq!(tools.count(ToolKind::SpecRunner), 0);
}

#[tokio::test]
async fn test_serve_without_build_sequence() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(
        project.config_with(Mode::Dev, fast_local),
        &tools,
        &notifier,
    );
    let plan = ExecutionPlan::for_task(Task::Serve);
    let shutdown = CancellationToken::new();

    let driver = async {
        sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    };

    let (results, _) = timeout(
        TEST_TIMEOUT,
        async { tokio::join!(orchestrator.run(&plan, shutdown.clone()), driver) },
    )
    .await
    .expect("orchestrator did not shut down");

    assert!(results.unwrap().runs.is_empty());
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn test_occupied_port_fails_fast() {
    let project = ProjectFixture::new();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let orchestrator = orchestrator(
        project.config_with(Mode::Dev, |p| p.server.port = port),
        &tools,
        &notifier,
    );

    let result = timeout(
        TEST_TIMEOUT,
        orchestrator.run(&ExecutionPlan::for_task(Task::Serve), CancellationToken::new()),
    )
    .await
    .expect("bind failure should return immediately");

    assert!(matches!(result, Err(OrchestratorError::Server(_))));
}

#[tokio::test]
async fn test_default_task_starts_without_spec_suite() {
    let project = ProjectFixture::new();
    std::fs::remove_dir_all(project.path("spec")).unwrap();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let config = project.config_with(Mode::Dev, fast_local);
    let plan = ExecutionPlan::for_task(Task::Default);

    config
        .validate_inputs(&plan.startup_pipelines())
        .expect("a missing spec suite must not block the asset build");

    let orchestrator = orchestrator(config, &tools, &notifier);
    let shutdown = CancellationToken::new();
    let driver = async {
        while notifier.all().len() < DEFAULT_SEQUENCE.len() {
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    };

    let (results, _) = timeout(
        TEST_TIMEOUT,
        async { tokio::join!(orchestrator.run(&plan, shutdown.clone()), driver) },
    )
    .await
    .expect("orchestrator did not shut down");

    let results = results.unwrap();
    assert_eq!(results.order(), DEFAULT_SEQUENCE.to_vec());
    assert!(!results.failed());
    assert!(project.exists("public/css/styles.css"));
}
