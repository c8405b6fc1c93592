//! Pipeline error types

use crate::core::{PipelineKind, StageKind};
use crate::tools::ToolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a stage. All of them end only the current pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("SASS compilation failed: {0}")]
    StyleCompile(String),

    #[error("Script bundling failed: {0}")]
    ScriptBundle(String),

    #[error("Spec suite failed: {0}")]
    TestFailure(String),

    #[error("Icon font generation failed: {0}")]
    IconFont(String),

    #[error("Image optimization failed for {path}: {message}")]
    ImageOptimize { path: PathBuf, message: String },

    #[error("Missing input file: {0}")]
    MissingInput(PathBuf),

    #[error("Stage '{0}' has no content to work on")]
    NoContent(&'static str),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Stage '{stage}' is not part of the {pipeline} pipeline")]
    UnsupportedStage {
        pipeline: PipelineKind,
        stage: StageKind,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
