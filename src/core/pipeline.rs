//! Pipeline domain model

use crate::core::{
    condition::StageCondition,
    config::{BuildConfig, BuildFlags},
    stage::{Stage, StageKind},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order of the one-shot build that precedes the watcher fan-out
pub const DEFAULT_SEQUENCE: [PipelineKind; 4] = [
    PipelineKind::Images,
    PipelineKind::IconFont,
    PipelineKind::Styles,
    PipelineKind::Scripts,
];

const STYLE_STAGES: &[Stage] = &[
    Stage::always(StageKind::Compile),
    Stage::always(StageKind::Concatenate),
    Stage::when(StageCondition::CombineMediaQueries, StageKind::CombineMediaQueries),
    Stage::always(StageKind::Autoprefix),
    Stage::when(StageCondition::Minify, StageKind::Minify),
    Stage::always(StageKind::Persist),
    Stage::when(StageCondition::ClearIntermediate, StageKind::Cleanup),
];

const SCRIPT_STAGES: &[Stage] = &[
    Stage::always(StageKind::Bundle),
    Stage::always(StageKind::Concatenate),
    Stage::when(StageCondition::Minify, StageKind::Minify),
    Stage::always(StageKind::Persist),
    Stage::when(StageCondition::ClearIntermediate, StageKind::Cleanup),
];

const ICON_FONT_STAGES: &[Stage] = &[
    Stage::always(StageKind::GenerateIconFont),
    Stage::always(StageKind::WriteIconStylesheet),
    Stage::when(StageCondition::ClearIntermediate, StageKind::Cleanup),
];

const IMAGE_STAGES: &[Stage] = &[Stage::always(StageKind::OptimizeImages)];

const TEST_STAGES: &[Stage] = &[Stage::always(StageKind::RunSpecs)];

/// The fixed set of asset pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    Images,
    IconFont,
    Styles,
    Scripts,
    Tests,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 5] = [
        PipelineKind::Images,
        PipelineKind::IconFont,
        PipelineKind::Styles,
        PipelineKind::Scripts,
        PipelineKind::Tests,
    ];

    /// Task name used on the command line
    pub fn label(self) -> &'static str {
        match self {
            PipelineKind::Images => "images",
            PipelineKind::IconFont => "icon-font",
            PipelineKind::Styles => "css",
            PipelineKind::Scripts => "js",
            PipelineKind::Tests => "test",
        }
    }

    /// Stages in execution order
    pub fn stages(self) -> &'static [Stage] {
        match self {
            PipelineKind::Images => IMAGE_STAGES,
            PipelineKind::IconFont => ICON_FONT_STAGES,
            PipelineKind::Styles => STYLE_STAGES,
            PipelineKind::Scripts => SCRIPT_STAGES,
            PipelineKind::Tests => TEST_STAGES,
        }
    }

    /// Stages that will run under the given flags
    pub fn active_stages(self, flags: &BuildFlags) -> Vec<StageKind> {
        self.stages()
            .iter()
            .filter(|stage| stage.condition.holds(flags))
            .map(|stage| stage.kind)
            .collect()
    }

    /// Flags governing this pipeline's optional stages
    pub fn flags(self, config: &BuildConfig) -> BuildFlags {
        match self {
            PipelineKind::Styles => config.styles.flags,
            PipelineKind::Scripts => config.scripts.flags,
            PipelineKind::IconFont => config.icon_font.flags,
            PipelineKind::Images | PipelineKind::Tests => BuildFlags::for_mode(config.mode),
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            PipelineKind::Images => "Images Optimized Successfully!",
            PipelineKind::IconFont => "Icon Font Compiled Successfully!",
            PipelineKind::Styles => "CSS Compiled Successfully!",
            PipelineKind::Scripts => "JS Compiled Successfully!",
            PipelineKind::Tests => "Specs Passed!",
        }
    }

    pub fn error_message(self) -> &'static str {
        match self {
            PipelineKind::Images => "Error optimizing images!",
            PipelineKind::IconFont => "Error compiling icon font!",
            PipelineKind::Styles => "Error compiling SASS!",
            PipelineKind::Scripts => "Error compiling JS!",
            PipelineKind::Tests => "Specs failed!",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
