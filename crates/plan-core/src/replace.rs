//! Task replacement (spec §4.2, "Replacement policy table").

use crate::error::{PlanError, Result};
use crate::ids::PlanObjectId;
use crate::plan::{Plan, ReplacementFilter};
use plan_relations::{replacement_action, Direction, EdgeAction};
use std::collections::HashSet;

impl Plan {
    /// Move/copy/skip every task-space edge incident on `old` onto
    /// `new` per the graph policy table, transfer mission/permanent
    /// flags, and validate `new` fulfills `old`'s declared model.
    /// Event relations are left untouched (spec §4.2: "tasks-events
    /// relations are not rewritten").
    pub fn replace_task(&mut self, old: PlanObjectId, new: PlanObjectId, filter: &ReplacementFilter) -> Result<()> {
        self.validate_replacement(old, new)?;
        self.rewrite_task_edges(old, new, filter)?;
        self.transfer_flags(old, new)?;
        self.revision += 1;
        Ok(())
    }

    /// As [`Plan::replace_task`], plus rewrite event-space edges that
    /// cross the boundary between `old`'s bound events and the rest of
    /// the plan, by corresponding event name (spec §4.2: "rewrites
    /// event relations crossing the task boundary, but never edges
    /// internal to the replaced subplan and never strong relations").
    pub fn replace(&mut self, old: PlanObjectId, new: PlanObjectId, filter: &ReplacementFilter) -> Result<()> {
        self.validate_replacement(old, new)?;
        self.rewrite_task_edges(old, new, filter)?;
        self.rewrite_crossing_event_edges(old, new, filter)?;
        self.transfer_flags(old, new)?;
        self.revision += 1;
        Ok(())
    }

    fn validate_replacement(&self, old: PlanObjectId, new: PlanObjectId) -> Result<()> {
        self.require_member(old)?;
        self.require_member(new)?;
        let old_task = self
            .task(old)
            .ok_or_else(|| PlanError::InvalidArgument(format!("{} is not a task", old)))?;
        let new_task = self
            .task(new)
            .ok_or_else(|| PlanError::InvalidArgument(format!("{} is not a task", new)))?;
        old_task
            .fullfilled_model
            .check_fulfilled_by(&new_task.fullfilled_model)
            .map_err(|reason| PlanError::InvalidReplace { old, new, reason })
    }

    fn rewrite_task_edges(&mut self, old: PlanObjectId, new: PlanObjectId, filter: &ReplacementFilter) -> Result<()> {
        let relations: Vec<_> = self.relations_task.relations().cloned().collect();
        for relation in relations {
            let policy = self.relations_task.graph(&relation)?.policy();

            let outgoing = self.task_neighbors(&relation, old, Direction::Outgoing)?;
            for other in outgoing {
                if other == new || !filter.allows(&relation, other) {
                    continue;
                }
                let info = self.relations_task.edge_info(&relation, old.to_node_ref(), other.to_node_ref())?.cloned();
                match replacement_action(&policy, true) {
                    EdgeAction::Skip => {}
                    EdgeAction::Move => {
                        self.remove_task_edge(&relation, old, other)?;
                        self.add_task_edge(&relation, new, other, info)?;
                    }
                    EdgeAction::Copy => {
                        self.add_task_edge(&relation, new, other, info)?;
                    }
                }
            }

            let incoming = self.task_neighbors(&relation, old, Direction::Incoming)?;
            for other in incoming {
                if other == new || !filter.allows(&relation, other) {
                    continue;
                }
                let info = self.relations_task.edge_info(&relation, other.to_node_ref(), old.to_node_ref())?.cloned();
                match replacement_action(&policy, false) {
                    EdgeAction::Skip => {}
                    EdgeAction::Move => {
                        self.remove_task_edge(&relation, other, old)?;
                        self.add_task_edge(&relation, other, new, info)?;
                    }
                    EdgeAction::Copy => {
                        self.add_task_edge(&relation, other, new, info)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn rewrite_crossing_event_edges(
        &mut self,
        old: PlanObjectId,
        new: PlanObjectId,
        filter: &ReplacementFilter,
    ) -> Result<()> {
        let old_events: HashSet<PlanObjectId> = self
            .task(old)
            .map(|t| t.events.values().copied().collect())
            .unwrap_or_default();
        // name -> new event id, to find the corresponding event on the
        // other side of the boundary.
        let by_name: std::collections::HashMap<String, PlanObjectId> = self
            .task(new)
            .map(|t| t.events.clone())
            .unwrap_or_default();
        let old_names: std::collections::HashMap<PlanObjectId, String> = self
            .task(old)
            .map(|t| t.events.iter().map(|(n, id)| (*id, n.clone())).collect())
            .unwrap_or_default();

        let relations: Vec<_> = self.relations_event.relations().cloned().collect();
        for relation in relations {
            let policy = self.relations_event.graph(&relation)?.policy();
            for &old_ev in &old_events {
                let Some(name) = old_names.get(&old_ev) else { continue };
                let Some(&new_ev) = by_name.get(name) else { continue };

                for other in self.event_neighbors(&relation, old_ev, Direction::Outgoing)? {
                    if old_events.contains(&other) || !filter.allows(&relation, other) {
                        continue; // internal to the replaced subplan, or excluded
                    }
                    let info = self
                        .relations_event
                        .edge_info(&relation, old_ev.to_node_ref(), other.to_node_ref())?
                        .cloned();
                    match replacement_action(&policy, true) {
                        EdgeAction::Skip => {}
                        EdgeAction::Move => {
                            self.remove_event_edge(&relation, old_ev, other)?;
                            self.add_event_edge(&relation, new_ev, other, info)?;
                        }
                        EdgeAction::Copy => {
                            self.add_event_edge(&relation, new_ev, other, info)?;
                        }
                    }
                }

                for other in self.event_neighbors(&relation, old_ev, Direction::Incoming)? {
                    if old_events.contains(&other) || !filter.allows(&relation, other) {
                        continue;
                    }
                    let info = self
                        .relations_event
                        .edge_info(&relation, other.to_node_ref(), old_ev.to_node_ref())?
                        .cloned();
                    match replacement_action(&policy, false) {
                        EdgeAction::Skip => {}
                        EdgeAction::Move => {
                            self.remove_event_edge(&relation, other, old_ev)?;
                            self.add_event_edge(&relation, other, new_ev, info)?;
                        }
                        EdgeAction::Copy => {
                            self.add_event_edge(&relation, other, new_ev, info)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn transfer_flags(&mut self, old: PlanObjectId, new: PlanObjectId) -> Result<()> {
        let was_mission = self.is_mission(old);
        let was_permanent = self.is_permanent(old);
        if was_mission {
            self.unmark_mission(old)?;
            self.mark_mission(new)?;
        }
        if was_permanent {
            self.unmark_permanent(old)?;
            self.mark_permanent(new)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn replace_rewrites_crossing_event_edges_by_name() {
        let mut plan = Plan::new();
        let old = plan.add_task(Task::new("worker"), &[]).unwrap();
        let new = plan.add_task(Task::new("worker"), &[]).unwrap();
        let trigger = plan.add_free_event("trigger", true).unwrap();

        let old_start = plan.task(old).unwrap().event(crate::task::EVENT_START).unwrap();
        plan.add_event_edge(&crate::relations::signals(), trigger, old_start, None).unwrap();

        plan.replace(old, new, &ReplacementFilter::new()).unwrap();

        let new_start = plan.task(new).unwrap().event(crate::task::EVENT_START).unwrap();
        assert!(plan
            .event_neighbors(&crate::relations::signals(), new_start, Direction::Incoming)
            .unwrap()
            .contains(&trigger));
        assert!(!plan
            .event_neighbors(&crate::relations::signals(), old_start, Direction::Incoming)
            .unwrap()
            .contains(&trigger));
    }

    #[test]
    fn replace_leaves_edges_internal_to_replaced_subplan_untouched() {
        // Both endpoints are bound events of `old`: internal to the
        // replaced subplan, so the crossing-edge rewrite must ignore it
        // entirely rather than duplicating it onto `new`.
        let mut plan = Plan::new();
        let old = plan.add_task(Task::new("worker"), &[]).unwrap();
        let new = plan.add_task(Task::new("worker"), &[]).unwrap();
        let old_start = plan.task(old).unwrap().event(crate::task::EVENT_START).unwrap();
        let old_stop = plan.task(old).unwrap().event(crate::task::EVENT_STOP).unwrap();
        plan.add_event_edge(&crate::relations::precedence(), old_start, old_stop, None).unwrap();

        plan.replace(old, new, &ReplacementFilter::new()).unwrap();

        let new_start = plan.task(new).unwrap().event(crate::task::EVENT_START).unwrap();
        let new_stop = plan.task(new).unwrap().event(crate::task::EVENT_STOP).unwrap();
        assert!(plan
            .event_neighbors(&crate::relations::precedence(), new_start, Direction::Outgoing)
            .unwrap()
            .is_empty());
        assert!(plan
            .event_neighbors(&crate::relations::precedence(), old_start, Direction::Outgoing)
            .unwrap()
            .contains(&old_stop));
    }
}
