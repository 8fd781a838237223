//! The fixed-period execution loop (spec §4.7).
//!
//! [`run_cycle`] owns nothing the plan doesn't already expose; it
//! sequences the seven per-cycle steps over a caller-supplied `Plan`,
//! `HandlerRegistry`, `FaultTable` and `JobTable`, each step a pure
//! function over shared mutable state rather than an actor with its
//! own queue.

use crate::error::ExecutionError;
use crate::fault::{apply_fault_responses, FaultTable};
use crate::jobs::{JobNotification, JobTable};
use crate::lifecycle::{check_dependency_failures, sync_task_states};
use crate::propagation::{reset_cycle_flags, run_to_fixpoint, Cycle, HandlerRegistry};
use plan_core::{Plan, PlanObjectId};
use std::collections::HashSet;

/// An inbound item gathered in step 1 (spec §4.7: "gather_external_events
/// (timers, incoming messages)").
pub enum ExternalEvent {
    Emit { generator: PlanObjectId, context: serde_json::Value },
    Call { generator: PlanObjectId, context: serde_json::Value },
}

/// A non-blocking poll over a running task (spec §4.7, step 2); may
/// queue further calls/emissions into the cycle it runs in.
pub type Poller = Box<dyn Fn(&mut Plan, PlanObjectId, &mut Cycle) + Send + Sync>;

#[derive(Default)]
pub struct CycleStats {
    pub cycle_number: u64,
    pub emissions: usize,
    pub fatal_exceptions: usize,
    pub reclaimed: usize,
}

/// Everything queued over a cycle and released together at
/// `cycle_end` (spec §4.7, step 7).
#[derive(Default)]
pub struct CycleEndNotifications {
    pub jobs: Vec<JobNotification>,
    pub fatal: Vec<ExecutionError>,
    pub stats: CycleStats,
}

#[tracing::instrument(skip_all, fields(cycle_number, now))]
pub fn run_cycle(
    plan: &mut Plan,
    now: u64,
    cycle_number: u64,
    external: Vec<ExternalEvent>,
    pollers: &[(PlanObjectId, Poller)],
    handlers: &HandlerRegistry,
    fault_table: &FaultTable,
    jobs: &mut JobTable,
) -> CycleEndNotifications {
    reset_cycle_flags(plan);
    let mut cycle = Cycle::new(now);

    // 1. gather_external_events
    for event in external {
        match event {
            ExternalEvent::Emit { generator, context } => cycle.queue_emit(generator, context),
            ExternalEvent::Call { generator, context } => cycle.queue_call(generator, context),
        }
    }

    // 2. run_pollers
    for (task, poller) in pollers {
        poller(plan, *task, &mut cycle);
    }

    // 3. propagate_events to fixpoint
    run_to_fixpoint(plan, handlers, &mut cycle);
    let mut errors = cycle.into_errors();
    let emissions = plan
        .all_events()
        .filter(|id| plan.event(*id).map(|g| g.emitted_this_cycle).unwrap_or(false))
        .count();

    // 4. check_structural_constraints
    errors.extend(plan_temporal::drain_missed(plan, now).into_iter().map(ExecutionError::from));
    sync_task_states(plan);
    errors.extend(check_dependency_failures(plan));

    let changed_tasks: Vec<PlanObjectId> = plan.tasks().collect();
    for task in changed_tasks {
        if let Some(state) = plan.task(task).map(|t| t.state) {
            jobs.on_task_state(plan, task, state);
        }
    }

    // 5. apply_fault_responses
    let mut fatal = Vec::new();
    for error in errors {
        fatal.extend(apply_fault_responses(plan, fault_table, error));
    }

    // 6. garbage_collect
    let reclaimed = garbage_collect(plan, cycle_number, now, handlers);

    // 7. cycle_end
    let fatal_exceptions = fatal.len();
    tracing::debug!(emissions, fatal_exceptions, reclaimed, "cycle end");
    CycleEndNotifications {
        jobs: jobs.drain(),
        fatal,
        stats: CycleStats { cycle_number, emissions, fatal_exceptions, reclaimed },
    }
}

/// Remove every task/event unreachable from a mission or permanent
/// root. Killed (non-terminal) tasks have their `stop` event called
/// rather than finalized on the spot; they are only actually removed
/// once that call has run them to a terminal state. Already-terminal
/// tasks and unreachable free events are removed directly (spec
/// §4.7, step 6).
fn garbage_collect(plan: &mut Plan, at_cycle: u64, now: u64, handlers: &HandlerRegistry) -> usize {
    let reachable = plan.reachable_from_roots();
    let all: HashSet<PlanObjectId> = plan
        .tasks()
        .chain(plan.free_events())
        .chain(plan.bound_events())
        .collect();
    let unreachable: Vec<PlanObjectId> = all.difference(&reachable).copied().collect();

    let mut kill_cycle = Cycle::new(now);
    for &id in &unreachable {
        let Some(task) = plan.task(id) else { continue };
        if task.state.is_terminal() {
            continue;
        }
        if let Some(stop) = task.event(plan_core::EVENT_STOP) {
            kill_cycle.queue_call(stop, serde_json::Value::Null);
        }
    }
    run_to_fixpoint(plan, handlers, &mut kill_cycle);
    sync_task_states(plan);

    let mut removed = 0;
    for id in unreachable {
        if let Some(task) = plan.task(id) {
            if task.state.is_terminal() && plan.remove(id, at_cycle).is_ok() {
                removed += 1;
            }
        } else if plan.event(id).map(|g| g.is_free()).unwrap_or(false) && plan.remove(id, at_cycle).is_ok() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::Task;

    #[test]
    fn unreachable_task_is_collected() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("root"), &[]).unwrap();
        plan.mark_mission(root).unwrap();
        let orphan = plan.add_task(Task::new("orphan"), &[]).unwrap();

        let handlers = HandlerRegistry::new();
        let fault_table = FaultTable::new();
        let mut jobs = JobTable::new();
        let notifications = run_cycle(&mut plan, 0, 1, Vec::new(), &[], &handlers, &fault_table, &mut jobs);

        assert_eq!(notifications.stats.reclaimed, 1);
        assert!(!plan.has(orphan));
        assert!(plan.has(root));
    }

    #[test]
    fn running_unreachable_task_is_stopped_before_removal() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("root"), &[]).unwrap();
        plan.mark_mission(root).unwrap();
        let worker = plan.add_task(Task::new("worker"), &[]).unwrap();
        plan.add_task_edge(&plan_core::relations::depends_on(), root, worker, None).unwrap();
        let start = plan.task(worker).unwrap().event(plan_core::EVENT_START).unwrap();

        let handlers = HandlerRegistry::new();
        let fault_table = FaultTable::new();
        let mut jobs = JobTable::new();
        run_cycle(
            &mut plan,
            0,
            1,
            vec![ExternalEvent::Call { generator: start, context: serde_json::Value::Null }],
            &[],
            &handlers,
            &fault_table,
            &mut jobs,
        );
        // Still reachable through `root`, so running normally.
        assert_eq!(plan.task(worker).unwrap().state, plan_core::TaskState::Running);

        plan.remove_task_edge(&plan_core::relations::depends_on(), root, worker).unwrap();
        let notifications = run_cycle(&mut plan, 1, 2, Vec::new(), &[], &handlers, &fault_table, &mut jobs);

        // Now unreachable: the running task is commanded to stop
        // rather than finalized on the spot, and disappears only
        // because that call actually drove it to a terminal state.
        assert!(!plan.has(worker));
        assert!(plan.is_finalized(worker));
        assert_eq!(notifications.stats.reclaimed, 1);
        assert!(plan.has(root));
    }
}
