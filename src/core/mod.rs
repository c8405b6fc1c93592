//! Core domain models
//!
//! This module defines the build configuration, the fixed set of asset
//! pipelines with their stages, and the per-run result types.

pub mod config;
pub mod condition;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod state;

pub use config::{BuildConfig, BuildFlags, Mode};
pub use condition::StageCondition;
pub use error::PipelineError;
pub use pipeline::*;
pub use stage::*;
pub use state::*;
