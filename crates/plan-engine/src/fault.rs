//! Fault-response tables and exception propagation (spec §4.6, §4.7's
//! "Exception propagation").
//!
//! An [`ExecutionError`] is localized to an origin plan object and
//! walked up the `depends_on`/`err_handled_by` edges toward plan
//! roots. At each node a registered [`FaultHandler`] may handle
//! (stopping propagation), pass (continue climbing unchanged), or
//! transform (continue climbing with a different error). An error
//! that reaches a root unhandled is fatal.

use crate::error::ExecutionError;
use plan_core::{Plan, PlanObjectId};
use plan_relations::Direction;
use std::collections::HashMap;
use std::sync::Arc;

pub enum FaultOutcome {
    Handled,
    Pass,
    Transform(ExecutionError),
}

pub type FaultHandler = Arc<dyn Fn(&mut Plan, &ExecutionError) -> FaultOutcome + Send + Sync>;

/// Handlers registered per task, tried in registration order; the
/// first one that does not `Pass` decides the outcome at that node
/// (spec §4.6: "handled by the first matching fault handler").
#[derive(Default)]
pub struct FaultTable {
    handlers: HashMap<PlanObjectId, Vec<FaultHandler>>,
}

impl FaultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: PlanObjectId, handler: FaultHandler) {
        self.handlers.entry(task).or_default().push(handler);
    }

    fn try_handlers(&self, plan: &mut Plan, task: PlanObjectId, error: &ExecutionError) -> Option<FaultOutcome> {
        for handler in self.handlers.get(&task)? {
            match handler(plan, error) {
                FaultOutcome::Pass => continue,
                other => return Some(other),
            }
        }
        None
    }
}

fn parents_of(plan: &Plan, task: PlanObjectId) -> Vec<PlanObjectId> {
    let mut parents = plan
        .task_neighbors(&plan_core::relations::depends_on(), task, Direction::Incoming)
        .unwrap_or_default();
    parents.extend(
        plan.task_neighbors(&plan_core::relations::err_handled_by(), task, Direction::Incoming)
            .unwrap_or_default(),
    );
    parents
}

/// Walk `error` up from its origin toward every reachable root,
/// applying `table` at each node. Returns every error that reached a
/// root unhandled, to be reported via `EXCEPTION_FATAL` by the caller.
pub fn apply_fault_responses(plan: &mut Plan, table: &FaultTable, error: ExecutionError) -> Vec<ExecutionError> {
    let Some(origin) = error.origin() else {
        return vec![error];
    };
    climb(plan, table, origin, error)
}

fn climb(plan: &mut Plan, table: &FaultTable, node: PlanObjectId, error: ExecutionError) -> Vec<ExecutionError> {
    let current = match table.try_handlers(plan, node, &error) {
        Some(FaultOutcome::Handled) => return Vec::new(),
        Some(FaultOutcome::Transform(transformed)) => transformed,
        Some(FaultOutcome::Pass) | None => error,
    };
    let parents = parents_of(plan, node);
    if parents.is_empty() {
        tracing::warn!(?node, error = %current, "fault reached a root unhandled, reporting fatal");
        return vec![current];
    }
    parents
        .into_iter()
        .flat_map(|parent| climb(plan, table, parent, current.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{Plan, Task};

    #[test]
    fn handler_at_parent_consumes_the_error() {
        let mut plan = Plan::new();
        let parent = plan.add_task(Task::new("p"), &[]).unwrap();
        let child = plan.add_task(Task::new("c"), &[]).unwrap();
        plan.add_task_edge(&plan_core::relations::depends_on(), parent, child, None)
            .unwrap();
        let mut table = FaultTable::new();
        table.register(parent, Arc::new(|_plan, _err| FaultOutcome::Handled));

        let error = ExecutionError::ChildFailedError { origin: child, affected: parent };
        let fatal = apply_fault_responses(&mut plan, &table, error);
        assert!(fatal.is_empty());
    }

    #[test]
    fn unhandled_error_at_root_is_fatal() {
        let mut plan = Plan::new();
        let parent = plan.add_task(Task::new("p"), &[]).unwrap();
        let child = plan.add_task(Task::new("c"), &[]).unwrap();
        plan.add_task_edge(&plan_core::relations::depends_on(), parent, child, None)
            .unwrap();
        let table = FaultTable::new();
        let error = ExecutionError::ChildFailedError { origin: child, affected: parent };
        let fatal = apply_fault_responses(&mut plan, &table, error.clone());
        assert_eq!(fatal, vec![error]);
    }
}
