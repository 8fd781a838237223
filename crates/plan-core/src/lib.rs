//! # plan-core
//!
//! Plan objects (tasks, event generators), the [`Plan`] aggregate that
//! owns them plus their relation spaces, task replacement, and the
//! transactional overlay used to batch mutations atomically.
//!
//! Identity here is always a [`PlanObjectId`] into a generational
//! [`Arena`] — never a reference — so that a task's bound events, an
//! edge endpoint, or a dangling reference to a finalized object can
//! all be represented and compared without lifetimes tying the graph
//! to any one borrow (spec §9, "Cyclic object graphs").
//!
//! This crate builds the plan data model; driving it through a cycle
//! (event propagation, task lifecycle, fault responses) is
//! `plan-engine`'s job, layered on top.

pub mod deadlines;
pub mod deltas;
pub mod error;
pub mod event;
pub mod ids;
pub mod plan;
mod replace;
pub mod relations;
pub mod task;
pub mod transaction;

pub use deadlines::{DeadlineEntry, EventDeadlines};
pub use deltas::{PlanDelta, StatusChange};
pub use error::{PlanError, Result};
pub use event::{Emission, EventGenerator, GeneratorState, Owner, DEFAULT_HISTORY_CAP};
pub use ids::{Arena, PlanObjectId};
pub use plan::{Plan, PlanObjectKind, PlanObjectRecord, ReplacementFilter};
pub use task::{FullfilledModel, Task, TaskState, EVENT_FAILED, EVENT_START, EVENT_STOP, EVENT_SUCCESS, STANDARD_EVENTS};
pub use transaction::{Transaction, TxOp};
