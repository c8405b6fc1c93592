//! Stage inclusion conditions

use crate::core::config::BuildFlags;

/// Predicate deciding whether a stage runs in the current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCondition {
    /// Stage runs in every mode
    Always,
    /// Stage runs when minification is enabled (production)
    Minify,
    /// Stage runs when media queries are combined (production)
    CombineMediaQueries,
    /// Stage runs when intermediate output is cleared (production)
    ClearIntermediate,
}

impl StageCondition {
    /// Evaluate the condition against the mode-derived flags
    pub fn holds(self, flags: &BuildFlags) -> bool {
        match self {
            StageCondition::Always => true,
            StageCondition::Minify => flags.minify,
            StageCondition::CombineMediaQueries => flags.combine_media_queries,
            StageCondition::ClearIntermediate => flags.clear_intermediate,
        }
    }

    /// Reason recorded when the stage is skipped
    pub fn skip_reason(self) -> &'static str {
        match self {
            StageCondition::Always => "never skipped",
            StageCondition::Minify => "minification disabled",
            StageCondition::CombineMediaQueries => "media query combination disabled",
            StageCondition::ClearIntermediate => "intermediate output kept",
        }
    }
}
