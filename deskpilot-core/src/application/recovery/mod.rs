mod classify;
mod dispatcher;
mod fallback;
mod policy;
pub mod workflow;

pub use classify::{ErrorCategory, classify_failure};
pub use dispatcher::{ErrorRecord, ErrorSummary, RecoveringDispatcher};
pub use fallback::{ArgumentAdapter, FallbackTable};
pub use policy::{FailureContext, RecoveryDecision, RecoveryPolicy};
pub use workflow::{
    Compensation, TaskStatus, Workflow, WorkflowExecutor, WorkflowStatus, WorkflowSummary,
    WorkflowTask,
};
