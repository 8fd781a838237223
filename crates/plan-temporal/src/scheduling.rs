//! Scheduling constraints: "schedule `b` as if it were `a`" (spec
//! §4.5, "Scheduling constraints").
//!
//! The event-space edge is the source of truth; when both endpoints
//! happen to be task-bound events, the owning tasks' relation is kept
//! in sync automatically so a task-level scheduler never has to walk
//! down to event granularity to answer "does this task's schedule
//! depend on that one's".

use crate::error::Result;
use plan_core::{Owner, Plan, PlanObjectId};

pub fn add_scheduling_constraint(plan: &mut Plan, a: PlanObjectId, b: PlanObjectId) -> Result<()> {
    plan.add_event_edge(&plan_core::relations::scheduling_constraint(), a, b, None)?;
    if let (Some(owner_a), Some(owner_b)) = (task_owner(plan, a), task_owner(plan, b)) {
        plan.add_task_edge(&plan_core::relations::task_scheduling_constraint(), owner_a, owner_b, None)?;
    }
    Ok(())
}

pub fn remove_scheduling_constraint(plan: &mut Plan, a: PlanObjectId, b: PlanObjectId) -> Result<()> {
    plan.remove_event_edge(&plan_core::relations::scheduling_constraint(), a, b)?;
    if let (Some(owner_a), Some(owner_b)) = (task_owner(plan, a), task_owner(plan, b)) {
        // Only drop the task-level mirror if no other task-bound event
        // pair between the same two tasks still carries the constraint.
        let still_needed = plan
            .task(owner_a)
            .map(|t| {
                t.events.values().any(|&ev| {
                    plan.event_neighbors(&plan_core::relations::scheduling_constraint(), ev, plan_relations::Direction::Outgoing)
                        .unwrap_or_default()
                        .iter()
                        .any(|&n| task_owner(plan, n) == Some(owner_b))
                })
            })
            .unwrap_or(false);
        if !still_needed {
            plan.remove_task_edge(&plan_core::relations::task_scheduling_constraint(), owner_a, owner_b)?;
        }
    }
    Ok(())
}

fn task_owner(plan: &Plan, event: PlanObjectId) -> Option<PlanObjectId> {
    match plan.event(event)?.owner {
        Owner::Task(t) => Some(t),
        Owner::Plan => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::Task;

    #[test]
    fn task_level_mirror_is_maintained_for_bound_events() {
        let mut plan = Plan::new();
        let t1 = plan.add_task(Task::new("a"), &[]).unwrap();
        let t2 = plan.add_task(Task::new("b"), &[]).unwrap();
        let e1 = plan.task(t1).unwrap().event("start").unwrap();
        let e2 = plan.task(t2).unwrap().event("start").unwrap();

        add_scheduling_constraint(&mut plan, e1, e2).unwrap();
        assert!(plan
            .task_neighbors(&plan_core::relations::task_scheduling_constraint(), t1, plan_relations::Direction::Outgoing)
            .unwrap()
            .contains(&t2));

        remove_scheduling_constraint(&mut plan, e1, e2).unwrap();
        assert!(!plan
            .task_neighbors(&plan_core::relations::task_scheduling_constraint(), t1, plan_relations::Direction::Outgoing)
            .unwrap()
            .contains(&t2));
    }

    #[test]
    fn free_events_get_no_task_mirror() {
        let mut plan = Plan::new();
        let e1 = plan.add_free_event("a", true).unwrap();
        let e2 = plan.add_free_event("b", true).unwrap();
        add_scheduling_constraint(&mut plan, e1, e2).unwrap();
        assert!(plan
            .event_neighbors(&plan_core::relations::scheduling_constraint(), e1, plan_relations::Direction::Outgoing)
            .unwrap()
            .contains(&e2));
    }
}
