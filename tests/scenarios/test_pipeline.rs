//! Spec suite pipeline

use crate::helpers::*;
use assetflow::core::{Mode, PipelineKind, StageKind, StageState};
use assetflow::tools::ToolKind;

#[tokio::test]
async fn test_passing_specs_report_summary() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Dev, &tools, &notifier);

    let run = engine.run_pipeline(PipelineKind::Tests).await;

    assert!(!run.failed);
    match run.stage_state(StageKind::RunSpecs) {
        Some(StageState::Completed { detail, .. }) => {
            assert_eq!(detail.as_deref(), Some("1 example (1 passed)"));
        }
        other => panic!("Expected completed specs, got {:?}", other),
    }
    assert_eq!(notifier.successes(), vec!["Specs Passed!"]);
}

#[tokio::test]
async fn test_failing_specs_do_not_stop_other_pipelines() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Dev, &tools, &notifier);

    tools.fail(ToolKind::SpecRunner);
    let results = engine
        .run_sequence(&[PipelineKind::Tests, PipelineKind::Images])
        .await;

    assert_eq!(results.failed_pipelines(), vec![PipelineKind::Tests]);
    assert_eq!(results.order(), vec![PipelineKind::Tests, PipelineKind::Images]);
    assert!(project.exists("public/images/logo.png"));
    assert_eq!(notifier.errors(), vec!["Specs failed!"]);
    assert_eq!(notifier.successes(), vec!["Images Optimized Successfully!"]);
}
