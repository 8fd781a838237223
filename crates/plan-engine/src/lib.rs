//! Event propagation, task lifecycle, and the per-cycle execution
//! loop (spec §4.3, §4.4, §4.7).

pub mod cycle;
pub mod error;
pub mod fault;
pub mod jobs;
pub mod lifecycle;
pub mod propagation;

pub use cycle::{run_cycle, CycleEndNotifications, CycleStats, ExternalEvent, Poller};
pub use error::{ExecutionError, Result};
pub use fault::{apply_fault_responses, FaultHandler, FaultOutcome, FaultTable};
pub use jobs::{JobNotification, JobTable};
pub use lifecycle::{check_dependency_failures, sync_task_states};
pub use propagation::{
    forward_to, is_live, reset_cycle_flags, run_to_fixpoint, signals, Cycle, HandlerFn, HandlerRegistry,
};
