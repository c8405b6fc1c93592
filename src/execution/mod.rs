//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod orchestrator;
pub mod plan;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{StageBuffer, StageExecutor};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use plan::{ExecutionPlan, LongRunning, Task};
