pub mod comic_flow;
pub mod stage;

pub use comic_flow::{ExecutionSummary, WorkflowOrchestrator, WorkflowResult};
pub use stage::{LogProgress, ProgressReporter, WorkflowStage};
