//! Image pipeline: only images newer than their optimized copy are processed

use crate::helpers::*;
use assetflow::core::{Mode, PipelineKind};
use assetflow::tools::{ToolInvocation, ToolKind};
use std::fs::File;
use std::time::{Duration, SystemTime};

fn backdate(path: &std::path::Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_optimizes_each_image_once() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    let first = engine.run_pipeline(PipelineKind::Images).await;

    assert!(!first.failed);
    assert_eq!(tools.count(ToolKind::ImageOptimizer), 2);
    assert_eq!(project.read("public/images/logo.png"), "optimized:PNG-DATA");
    assert_eq!(
        project.read("public/images/photos/beach.jpg"),
        "optimized:JPG-DATA"
    );

    tools.reset();
    let second = engine.run_pipeline(PipelineKind::Images).await;

    assert!(!second.failed);
    assert_eq!(tools.count(ToolKind::ImageOptimizer), 0);
    assert_eq!(notifier.successes().len(), 2);
}

#[tokio::test]
async fn test_changed_image_is_reprocessed() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    engine.run_pipeline(PipelineKind::Images).await;
    backdate(&project.path("public/images/logo.png"), Duration::from_secs(60));
    backdate(&project.path("assets/images/logo.png"), Duration::from_secs(120));
    backdate(&project.path("public/images/photos/beach.jpg"), Duration::from_secs(60));
    backdate(&project.path("assets/images/photos/beach.jpg"), Duration::from_secs(120));

    project.write("assets/images/logo.png", "PNG-DATA-2");
    tools.reset();
    engine.run_pipeline(PipelineKind::Images).await;

    assert_eq!(
        tools.calls_of(ToolKind::ImageOptimizer),
        vec![ToolInvocation::OptimizeImage {
            source: project.path("assets/images/logo.png"),
        }]
    );
    assert_eq!(project.read("public/images/logo.png"), "optimized:PNG-DATA-2");
}

#[tokio::test]
async fn test_unlisted_extensions_are_ignored() {
    let project = ProjectFixture::new();
    project.write("assets/images/notes.txt", "not an image");
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Dev, &tools, &notifier);

    engine.run_pipeline(PipelineKind::Images).await;

    assert_eq!(tools.count(ToolKind::ImageOptimizer), 2);
    assert!(!project.exists("public/images/notes.txt"));
}

#[tokio::test]
async fn test_optimizer_failure_names_the_image() {
    let project = ProjectFixture::new();
    let tools = MockTools::new();
    let notifier = RecordingNotifier::new();
    let engine = project.engine(Mode::Production, &tools, &notifier);

    tools.fail(ToolKind::ImageOptimizer);
    let run = engine.run_pipeline(PipelineKind::Images).await;

    assert!(run.failed);
    assert_eq!(tools.count(ToolKind::ImageOptimizer), 1);
    assert!(run.error().unwrap().contains("logo.png"));
    assert_eq!(notifier.errors(), vec!["Error optimizing images!"]);
}
