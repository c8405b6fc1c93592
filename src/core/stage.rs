//! Stage domain model

use crate::core::condition::StageCondition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One transformation step within a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// SASS to CSS into the intermediate directory
    Compile,
    /// Resolve the JS entry's dependency graph into one intermediate file
    Bundle,
    /// Join vendor files and the intermediate artifact, in declared order
    Concatenate,
    CombineMediaQueries,
    Autoprefix,
    Minify,
    /// Write the in-flight content to the production directory
    Persist,
    /// Delete intermediate artifacts
    Cleanup,
    GenerateIconFont,
    WriteIconStylesheet,
    OptimizeImages,
    RunSpecs,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Compile => "compile",
            StageKind::Bundle => "bundle",
            StageKind::Concatenate => "concatenate",
            StageKind::CombineMediaQueries => "combine-media-queries",
            StageKind::Autoprefix => "autoprefix",
            StageKind::Minify => "minify",
            StageKind::Persist => "persist",
            StageKind::Cleanup => "cleanup",
            StageKind::GenerateIconFont => "generate-icon-font",
            StageKind::WriteIconStylesheet => "write-icon-stylesheet",
            StageKind::OptimizeImages => "optimize-images",
            StageKind::RunSpecs => "run-specs",
        }
    }

    /// Whether the stage still runs after an earlier stage of its run failed
    pub fn is_finalizer(self) -> bool {
        matches!(self, StageKind::Cleanup)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage paired with the condition that includes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    pub condition: StageCondition,
}

impl Stage {
    /// A stage that runs in every mode
    pub const fn always(kind: StageKind) -> Self {
        Self {
            kind,
            condition: StageCondition::Always,
        }
    }

    /// A stage that runs only when `condition` holds
    pub const fn when(condition: StageCondition, kind: StageKind) -> Self {
        Self { kind, condition }
    }
}
