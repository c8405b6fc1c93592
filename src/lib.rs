//! assetflow - a frontend asset build orchestrator

pub mod assets;
pub mod cli;
pub mod core;
pub mod execution;
pub mod notifier;
pub mod server;
pub mod tools;
pub mod watch;

// Re-export commonly used types
pub use core::{BuildConfig, Mode, PipelineError, PipelineKind, RunResult, SequenceResult};
pub use execution::{ExecutionEngine, ExecutionEvent, ExecutionPlan, Orchestrator, Task};
pub use notifier::{Notification, Notifier, Reporter};
pub use tools::{SubprocessToolRunner, ToolError, ToolInvocation, ToolOutput, ToolRunner};
