//! Task lifecycle driving and dependency-failure diagnosis (spec
//! §4.4).

use crate::error::ExecutionError;
use plan_core::{Plan, PlanObjectId, TaskState};
use plan_relations::Direction;

/// Advance every task's state machine from the standard events that
/// fired this cycle (spec §4.4, "Lifecycle"). Must run after
/// [`crate::propagation::run_to_fixpoint`] and before its flags are
/// reset by the next cycle.
pub fn sync_task_states(plan: &mut Plan) {
    let task_ids: Vec<PlanObjectId> = plan.tasks().collect();
    for task_id in task_ids {
        let Some(task) = plan.task(task_id) else { continue };
        let start = task.event(plan_core::EVENT_START);
        let success = task.event(plan_core::EVENT_SUCCESS);
        let failed = task.event(plan_core::EVENT_FAILED);
        let stop = task.event(plan_core::EVENT_STOP);
        let state = task.state;

        let start_fired = start.and_then(|e| plan.event(e)).map(|g| g.emitted_this_cycle).unwrap_or(false);
        let success_fired = success.and_then(|e| plan.event(e)).map(|g| g.emitted_this_cycle).unwrap_or(false);
        let failed_fired = failed.and_then(|e| plan.event(e)).map(|g| g.emitted_this_cycle).unwrap_or(false);
        let stop_fired = stop.and_then(|e| plan.event(e)).map(|g| g.emitted_this_cycle).unwrap_or(false);

        if state == TaskState::Pending && start_fired {
            if let Some(t) = plan.task_mut(task_id) {
                t.transition(TaskState::Starting);
                t.transition(TaskState::Running);
            }
        } else if state == TaskState::Running && (success_fired || failed_fired) {
            if let Some(t) = plan.task_mut(task_id) {
                t.transition(TaskState::Finishing);
            }
        } else if state == TaskState::Running && stop_fired {
            // Killed mid-run: no success/failed decision was ever
            // made, so `stop` alone drives the task through finishing.
            if let Some(t) = plan.task_mut(task_id) {
                t.transition(TaskState::Finishing);
            }
        } else if (state == TaskState::Pending || state == TaskState::Starting) && stop_fired && !start_fired {
            // `start` never emitted before the task was stopped, whether
            // it was waiting to start or mid-start.
            if let Some(t) = plan.task_mut(task_id) {
                t.state = TaskState::FailedToStart;
            }
        }

        if plan.task(task_id).map(|t| t.state) == Some(TaskState::Finishing) && stop_fired {
            if let Some(t) = plan.task_mut(task_id) {
                t.transition(TaskState::Finished);
            }
        }
    }
}

fn required_events(info: Option<&serde_json::Value>) -> Vec<String> {
    match info.and_then(|v| v.as_array()) {
        Some(arr) => arr.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        None => vec![plan_core::EVENT_SUCCESS.to_string()],
    }
}

/// `parent --depends_on(required_events)--> child`: raise
/// [`ExecutionError::ChildFailedError`] for every child that emitted
/// `stop` this cycle without first emitting one of its edge's
/// required events (spec §4.4, "Dependency failures").
pub fn check_dependency_failures(plan: &Plan) -> Vec<ExecutionError> {
    let mut errors = Vec::new();
    let relation = plan_core::relations::depends_on();
    let Ok(graph) = plan.relations_task.graph(&relation) else {
        return errors;
    };
    for parent in plan.tasks() {
        for child in plan
            .task_neighbors(&relation, parent, Direction::Outgoing)
            .unwrap_or_default()
        {
            let Some(child_task) = plan.task(child) else { continue };
            let Some(stop_id) = child_task.event(plan_core::EVENT_STOP) else { continue };
            let Some(stop_gen) = plan.event(stop_id) else { continue };
            if !stop_gen.emitted_this_cycle {
                continue;
            }
            let info = graph.edge_info(parent.to_node_ref(), child.to_node_ref());
            let required = required_events(info);
            let satisfied = required.iter().any(|name| {
                child_task
                    .event(name)
                    .and_then(|id| plan.event(id))
                    .map(|g| g.emitted())
                    .unwrap_or(false)
            });
            if !satisfied {
                errors.push(ExecutionError::ChildFailedError { origin: child, affected: parent });
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{Plan, PlanObjectKind, Task};

    fn finish(plan: &mut Plan, task: PlanObjectId, event_name: &str) {
        let ev = plan.task(task).unwrap().event(event_name).unwrap();
        if let Some(PlanObjectKind::Event(g)) = plan.object_mut(ev) {
            g.state = plan_core::GeneratorState::Added;
            g.record_emission(plan_core::Emission { cycle: 0, time: 0, context: serde_json::Value::Null });
            g.emitted_this_cycle = true;
        }
    }

    #[test]
    fn start_then_success_then_stop_drives_lifecycle() {
        let mut plan = Plan::new();
        let t = plan.add_task(Task::new("demo"), &[]).unwrap();
        finish(&mut plan, t, plan_core::EVENT_START);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::Running);

        finish(&mut plan, t, plan_core::EVENT_SUCCESS);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::Finishing);

        finish(&mut plan, t, plan_core::EVENT_STOP);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::Finished);
    }

    #[test]
    fn stop_alone_kills_a_running_task() {
        let mut plan = Plan::new();
        let t = plan.add_task(Task::new("demo"), &[]).unwrap();
        finish(&mut plan, t, plan_core::EVENT_START);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::Running);

        finish(&mut plan, t, plan_core::EVENT_STOP);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::Finished);
    }

    #[test]
    fn stop_before_start_fails_a_pending_task() {
        let mut plan = Plan::new();
        let t = plan.add_task(Task::new("demo"), &[]).unwrap();
        finish(&mut plan, t, plan_core::EVENT_STOP);
        sync_task_states(&mut plan);
        assert_eq!(plan.task(t).unwrap().state, TaskState::FailedToStart);
    }

    #[test]
    fn child_stop_without_success_raises_child_failed() {
        let mut plan = Plan::new();
        let parent = plan.add_task(Task::new("p"), &[]).unwrap();
        let child = plan.add_task(Task::new("c"), &[]).unwrap();
        plan.add_task_edge(&plan_core::relations::depends_on(), parent, child, None)
            .unwrap();
        finish(&mut plan, child, plan_core::EVENT_STOP);
        let errors = check_dependency_failures(&plan);
        assert_eq!(errors, vec![ExecutionError::ChildFailedError { origin: child, affected: parent }]);
    }
}
