//! Test utilities: a mock tool runner, a recording notifier and a project fixture

use assetflow::core::config::ProjectConfig;
use assetflow::core::{BuildConfig, Mode};
use assetflow::execution::ExecutionEngine;
use assetflow::notifier::{Notification, NotificationLevel, Notifier};
use assetflow::tools::{ToolError, ToolInvocation, ToolKind, ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const NORMALIZE: &str = "html { margin: 0; }";
pub const MODERNIZR: &str = "window.Modernizr = {};";
pub const JQUERY: &str = "window.jQuery = {};";
pub const MAIN_SCSS: &str = "body { color: red; }";
pub const MAIN_JS: &str = "console.log('app');";

/// Tool runner with deterministic, file-backed fake tools
#[derive(Clone, Default)]
pub struct MockTools {
    calls: Arc<Mutex<Vec<ToolInvocation>>>,
    failing: Arc<Mutex<HashSet<ToolKind>>>,
}

impl MockTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `tool` exit non-zero
    pub fn fail(&self, tool: ToolKind) {
        self.failing.lock().unwrap().insert(tool);
    }

    pub fn recover(&self, tool: ToolKind) {
        self.failing.lock().unwrap().remove(&tool);
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, tool: ToolKind) -> Vec<ToolInvocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.kind() == tool)
            .collect()
    }

    pub fn count(&self, tool: ToolKind) -> usize {
        self.calls_of(tool).len()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn io_failure(tool: ToolKind, e: std::io::Error) -> ToolError {
    ToolError::Failed {
        tool,
        code: 2,
        stderr: e.to_string(),
    }
}

#[async_trait]
impl ToolRunner for MockTools {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let tool = invocation.kind();
        if self.failing.lock().unwrap().contains(&tool) {
            return Err(ToolError::Failed {
                tool,
                code: 1,
                stderr: format!("{} exploded", tool),
            });
        }

        match invocation {
            ToolInvocation::CompileStyles {
                entry,
                output,
                style,
                source_maps,
            } => {
                let source = fs::read_to_string(entry).map_err(|e| io_failure(tool, e))?;
                let mut css = format!("/* {} */\n{}", style, source);
                if *source_maps {
                    css.push_str("\n/*# sourceMappingURL=main.css.map */");
                    fs::write(format!("{}.map", output.display()), "{}")
                        .map_err(|e| io_failure(tool, e))?;
                }
                fs::write(output, css).map_err(|e| io_failure(tool, e))?;
                Ok(ToolOutput::default())
            }
            ToolInvocation::BundleScripts { entry, output, .. } => {
                let source = fs::read_to_string(entry).map_err(|e| io_failure(tool, e))?;
                fs::write(output, format!("(function () {{\n{}\n}})();", source))
                    .map_err(|e| io_failure(tool, e))?;
                Ok(ToolOutput::default())
            }
            ToolInvocation::CombineMediaQueries { css } => {
                Ok(ToolOutput::from_text(format!("{}\n/* mq */", css)))
            }
            ToolInvocation::Autoprefix { css, .. } => {
                Ok(ToolOutput::from_text(format!("/* prefixed */\n{}", css)))
            }
            ToolInvocation::MinifyCss { css } => Ok(ToolOutput::from_text(minify(css))),
            ToolInvocation::MinifyJs { js } => Ok(ToolOutput::from_text(minify(js))),
            ToolInvocation::GenerateIconFont {
                output_dir,
                font_name,
                ..
            } => {
                for ext in ["eot", "svg", "ttf", "woff", "woff2"] {
                    fs::write(output_dir.join(format!("{}.{}", font_name, ext)), "font")
                        .map_err(|e| io_failure(tool, e))?;
                }
                Ok(ToolOutput::default())
            }
            ToolInvocation::OptimizeImage { source } => {
                let mut bytes = b"optimized:".to_vec();
                bytes.extend(fs::read(source).map_err(|e| io_failure(tool, e))?);
                Ok(ToolOutput {
                    stdout: bytes,
                    stderr: String::new(),
                })
            }
            ToolInvocation::RunSpecs { .. } => {
                Ok(ToolOutput::from_text("1 specs\n1 example (1 passed)\n"))
            }
        }
    }
}

fn minify(text: &str) -> String {
    text.lines().map(str::trim).collect()
}

/// Notifier that keeps everything it was asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NotificationLevel::Success)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotificationLevel::Error)
    }

    fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

/// A temporary project with the stock layout and a few sources
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fixture.write("assets/sass/main.scss", MAIN_SCSS);
        fixture.write("assets/js/main.js", MAIN_JS);
        fixture.write("bower_components/normalize.css/normalize.css", NORMALIZE);
        fixture.write("bower_components/modernizr/modernizr.js", MODERNIZR);
        fixture.write("bower_components/jquery/dist/jquery.js", JQUERY);
        fixture.write("assets/icon-font/home.svg", "<svg id=\"home\"/>");
        fixture.write("assets/icon-font/search.svg", "<svg id=\"search\"/>");
        fixture.write("assets/images/logo.png", "PNG-DATA");
        fixture.write("assets/images/photos/beach.jpg", "JPG-DATA");
        fixture.write("spec/DummySpec.php", "<?php");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn config(&self, mode: Mode) -> Arc<BuildConfig> {
        self.config_with(mode, |_| {})
    }

    pub fn config_with(&self, mode: Mode, adjust: impl FnOnce(&mut ProjectConfig)) -> Arc<BuildConfig> {
        let mut project = ProjectConfig::default();
        adjust(&mut project);
        Arc::new(BuildConfig::resolve(mode, &project, self.root()))
    }

    pub fn engine(
        &self,
        mode: Mode,
        tools: &MockTools,
        notifier: &Arc<RecordingNotifier>,
    ) -> ExecutionEngine<MockTools> {
        ExecutionEngine::new(tools.clone(), self.config(mode), notifier.clone())
    }
}
