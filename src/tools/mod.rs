//! External tool seam
//!
//! Every heavy transformation (SASS, bundling, postcss plugins, minifiers, the
//! font generator, the image optimizer and the spec runner) is reached through
//! [`ToolRunner`]. The engine only decides *when* a tool runs and what happens
//! to its output.

pub mod command;
pub mod subprocess;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use command::{CommandSpec, ToolCommands};
pub use subprocess::SubprocessToolRunner;

/// Trait for tool execution - allows for different implementations
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run one tool invocation to completion
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Which external tool an invocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    StyleCompiler,
    ScriptBundler,
    MediaQueryCombiner,
    Autoprefixer,
    CssMinifier,
    JsMinifier,
    IconFontGenerator,
    ImageOptimizer,
    SpecRunner,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::StyleCompiler => "style-compiler",
            ToolKind::ScriptBundler => "script-bundler",
            ToolKind::MediaQueryCombiner => "media-query-combiner",
            ToolKind::Autoprefixer => "autoprefixer",
            ToolKind::CssMinifier => "css-minifier",
            ToolKind::JsMinifier => "js-minifier",
            ToolKind::IconFontGenerator => "icon-font-generator",
            ToolKind::ImageOptimizer => "image-optimizer",
            ToolKind::SpecRunner => "spec-runner",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single request to an external tool.
///
/// File-producing tools (`CompileStyles`, `BundleScripts`,
/// `GenerateIconFont`) write their output to disk; content transforms receive
/// their input on stdin and answer on stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    CompileStyles {
        entry: PathBuf,
        output: PathBuf,
        style: String,
        source_maps: bool,
    },
    BundleScripts {
        entry: PathBuf,
        output: PathBuf,
        source_maps: bool,
    },
    CombineMediaQueries {
        css: String,
    },
    Autoprefix {
        css: String,
        browsers: Vec<String>,
    },
    MinifyCss {
        css: String,
    },
    MinifyJs {
        js: String,
    },
    GenerateIconFont {
        source_dir: PathBuf,
        output_dir: PathBuf,
        font_name: String,
        codepoints: PathBuf,
    },
    OptimizeImage {
        source: PathBuf,
    },
    RunSpecs {
        suite_dir: PathBuf,
    },
}

impl ToolInvocation {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::CompileStyles { .. } => ToolKind::StyleCompiler,
            ToolInvocation::BundleScripts { .. } => ToolKind::ScriptBundler,
            ToolInvocation::CombineMediaQueries { .. } => ToolKind::MediaQueryCombiner,
            ToolInvocation::Autoprefix { .. } => ToolKind::Autoprefixer,
            ToolInvocation::MinifyCss { .. } => ToolKind::CssMinifier,
            ToolInvocation::MinifyJs { .. } => ToolKind::JsMinifier,
            ToolInvocation::GenerateIconFont { .. } => ToolKind::IconFontGenerator,
            ToolInvocation::OptimizeImage { .. } => ToolKind::ImageOptimizer,
            ToolInvocation::RunSpecs { .. } => ToolKind::SpecRunner,
        }
    }

    /// Content piped to the tool's stdin, if any
    pub fn stdin(&self) -> Option<&str> {
        match self {
            ToolInvocation::CombineMediaQueries { css }
            | ToolInvocation::Autoprefix { css, .. }
            | ToolInvocation::MinifyCss { css } => Some(css),
            ToolInvocation::MinifyJs { js } => Some(js),
            _ => None,
        }
    }

    /// Placeholder values available to the tool's command template
    pub fn variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        let mut set = |key: &str, value: String| {
            vars.insert(key.to_string(), value);
        };

        match self {
            ToolInvocation::CompileStyles {
                entry,
                output,
                style,
                source_maps,
            } => {
                set("input", entry.display().to_string());
                set("output", output.display().to_string());
                set("style", style.clone());
                set(
                    "source_map_flag",
                    if *source_maps {
                        "--embed-source-map"
                    } else {
                        "--no-source-map"
                    }
                    .to_string(),
                );
            }
            ToolInvocation::BundleScripts {
                entry,
                output,
                source_maps,
            } => {
                set("input", entry.display().to_string());
                set("output", output.display().to_string());
                set(
                    "debug_flag",
                    if *source_maps { "--debug" } else { "" }.to_string(),
                );
            }
            ToolInvocation::Autoprefix { browsers, .. } => {
                set("browsers", browsers.join(", "));
            }
            ToolInvocation::GenerateIconFont {
                source_dir,
                output_dir,
                font_name,
                codepoints,
            } => {
                set("input", source_dir.display().to_string());
                set("output", output_dir.display().to_string());
                set("font_name", font_name.clone());
                set("codepoints", codepoints.display().to_string());
            }
            ToolInvocation::OptimizeImage { source } => {
                set("input", source.display().to_string());
            }
            ToolInvocation::RunSpecs { suite_dir } => {
                set("suite_dir", suite_dir.display().to_string());
            }
            ToolInvocation::CombineMediaQueries { .. }
            | ToolInvocation::MinifyCss { .. }
            | ToolInvocation::MinifyJs { .. } => {}
        }

        vars
    }
}

/// Captured output of a finished tool
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into().into_bytes(),
            stderr: String::new(),
        }
    }

    /// Decode stdout as UTF-8 text
    pub fn into_text(self, tool: ToolKind) -> Result<String, ToolError> {
        String::from_utf8(self.stdout).map_err(|_| ToolError::InvalidOutput { tool })
    }
}

/// Error types for tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to start {tool}: {message}")]
    Spawn { tool: ToolKind, message: String },

    #[error("{tool} exited with code {code}: {stderr}")]
    Failed {
        tool: ToolKind,
        code: i32,
        stderr: String,
    },

    #[error("{tool} produced output that is not valid UTF-8")]
    InvalidOutput { tool: ToolKind },
}
