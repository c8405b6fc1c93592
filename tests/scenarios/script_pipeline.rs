//! JS pipeline: bundle, prepend vendor libraries, minify, persist

use crate::helpers::*;
use assetflow::core::{Mode, PipelineKind, StageKind, StageState};
use assetflow::tools::{ToolInvocation, ToolKind};

#[tokio::test]
async fn test_vendor_libraries_precede_bundle() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Dev, &tools, &notifier);

    let run = engine.run_pipeline(PipelineKind::Scripts).await;

    assert!(!run.failed);
    assert_eq!(
        project.read("public/js/scripts.js"),
        format!(
            "{}\n{}\n(function () {{\n{}\n}})();",
            MODERNIZR, JQUERY, MAIN_JS
        )
    );
    assert_eq!(
        run.skipped_stages(),
        vec![StageKind::Minify, StageKind::Cleanup]
    );
    assert!(project.exists("temp/main.js"));
    assert!(matches!(
        &tools.calls_of(ToolKind::ScriptBundler)[..],
        [ToolInvocation::BundleScripts {
            source_maps: true,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_production_minifies_and_removes_bundle() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    let run = engine.run_pipeline(PipelineKind::Scripts).await;

    assert!(!run.failed);
    let output = project.read("public/js/scripts.js");
    assert!(!output.contains('\n'));
    let modernizr = output.find(MODERNIZR).unwrap();
    let jquery = output.find(JQUERY).unwrap();
    let app = output.find(MAIN_JS).unwrap();
    assert!(modernizr < jquery && jquery < app);

    assert!(!project.exists("temp/main.js"));
    assert_eq!(tools.count(ToolKind::JsMinifier), 1);
    assert_eq!(notifier.successes(), vec!["JS Compiled Successfully!"]);
}

#[tokio::test]
async fn test_bundle_failure_keeps_previous_output() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    engine.run_pipeline(PipelineKind::Scripts).await;
    let previous = project.read("public/js/scripts.js");

    tools.fail(ToolKind::ScriptBundler);
    let run = engine.run_pipeline(PipelineKind::Scripts).await;

    assert!(run.failed);
    assert!(run.error().unwrap().contains("bundling failed"));
    assert_eq!(project.read("public/js/scripts.js"), previous);
    assert_eq!(notifier.errors(), vec!["Error compiling JS!"]);
    assert_eq!(notifier.successes(), vec!["JS Compiled Successfully!"]);
}

#[tokio::test]
async fn test_failed_minify_still_removes_bundle() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    tools.fail(ToolKind::JsMinifier);
    let run = engine.run_pipeline(PipelineKind::Scripts).await;

    assert!(run.failed);
    assert!(!project.exists("temp/main.js"));
    assert!(!project.exists("public/js/scripts.js"));
    assert!(matches!(
        run.stage_state(StageKind::Minify),
        Some(StageState::Failed { .. })
    ));
    assert!(run.stage_state(StageKind::Persist).is_none());
    assert_eq!(
        run.completed_stages(),
        vec![StageKind::Bundle, StageKind::Concatenate, StageKind::Cleanup]
    );
    assert_eq!(notifier.errors(), vec!["Error compiling JS!"]);
}
