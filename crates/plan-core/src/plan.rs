//! The plan aggregate (spec §3, "Plan"; spec §4.2).

use crate::deadlines::EventDeadlines;
use crate::deltas::{PlanDelta, StatusChange};
use crate::error::{PlanError, Result};
use crate::event::{EventGenerator, Owner};
use crate::ids::{Arena, PlanObjectId};
use crate::relations;
use crate::task::{Task, STANDARD_EVENTS};
use plan_relations::{AddOutcome, Direction, EdgeInfo, RelationId, RelationRegistry, RelationSpace};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum PlanObjectKind {
    Task(Task),
    Event(EventGenerator),
}

impl PlanObjectKind {
    pub fn as_task(&self) -> Option<&Task> {
        match self {
            PlanObjectKind::Task(t) => Some(t),
            _ => None,
        }
    }
    pub fn as_task_mut(&mut self) -> Option<&mut Task> {
        match self {
            PlanObjectKind::Task(t) => Some(t),
            _ => None,
        }
    }
    pub fn as_event(&self) -> Option<&EventGenerator> {
        match self {
            PlanObjectKind::Event(e) => Some(e),
            _ => None,
        }
    }
    pub fn as_event_mut(&mut self) -> Option<&mut EventGenerator> {
        match self {
            PlanObjectKind::Event(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanObjectRecord {
    pub kind: PlanObjectKind,
    /// Null while live, per spec §3 ("finalization timestamp (null
    /// while live)"). Objects are kept in the arena after removal
    /// rather than deallocated, so `o.plan = null` is represented by
    /// absence from the membership sets, not absence from the arena —
    /// this is what lets `finalized_at` stay inspectable afterwards.
    pub finalized_at: Option<u64>,
}

/// Excludes specific tasks, relation classes, or (not modelled
/// separately, since a graph == a relation class here) entire graphs
/// from a replacement, per spec §4.2.
#[derive(Debug, Clone, Default)]
pub struct ReplacementFilter {
    pub excluded_tasks: HashSet<PlanObjectId>,
    pub excluded_relations: HashSet<RelationId>,
}

impl ReplacementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_task(mut self, task: PlanObjectId) -> Self {
        self.excluded_tasks.insert(task);
        self
    }

    pub fn exclude_relation(mut self, relation: RelationId) -> Self {
        self.excluded_relations.insert(relation);
        self
    }

    pub(crate) fn allows(&self, relation: &RelationId, other: PlanObjectId) -> bool {
        !self.excluded_relations.contains(relation) && !self.excluded_tasks.contains(&other)
    }
}

pub struct Plan {
    pub(crate) objects: Arena<PlanObjectRecord>,
    pub(crate) tasks: HashSet<PlanObjectId>,
    pub(crate) free_events: HashSet<PlanObjectId>,
    pub(crate) task_bound_events: HashSet<PlanObjectId>,
    pub(crate) mission: HashSet<PlanObjectId>,
    pub(crate) permanent: HashSet<PlanObjectId>,
    pub relations_task: RelationSpace,
    pub relations_event: RelationSpace,
    deadlines: EventDeadlines,
    pub(crate) revision: u64,
    deltas: Vec<PlanDelta>,
    status_events: Vec<(PlanObjectId, StatusChange)>,
}

impl Clone for Plan {
    fn clone(&self) -> Self {
        Plan {
            objects: self.objects.clone(),
            tasks: self.tasks.clone(),
            free_events: self.free_events.clone(),
            task_bound_events: self.task_bound_events.clone(),
            mission: self.mission.clone(),
            permanent: self.permanent.clone(),
            relations_task: self.relations_task.clone(),
            relations_event: self.relations_event.clone(),
            deadlines: self.deadlines.clone(),
            revision: self.revision,
            deltas: Vec::new(),
            status_events: Vec::new(),
        }
    }
}

impl Plan {
    pub fn new() -> Self {
        Plan::with_registries(Arc::new(relations::task_registry()), Arc::new(relations::event_registry()))
    }

    pub fn with_registries(task_registry: Arc<RelationRegistry>, event_registry: Arc<RelationRegistry>) -> Self {
        Plan {
            objects: Arena::new(),
            tasks: HashSet::new(),
            free_events: HashSet::new(),
            task_bound_events: HashSet::new(),
            mission: HashSet::new(),
            permanent: HashSet::new(),
            relations_task: RelationSpace::new(task_registry),
            relations_event: RelationSpace::new(event_registry),
            deadlines: EventDeadlines::new(),
            revision: 0,
            deltas: Vec::new(),
            status_events: Vec::new(),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn deadlines(&self) -> &EventDeadlines {
        &self.deadlines
    }

    pub fn deadlines_mut(&mut self) -> &mut EventDeadlines {
        &mut self.deadlines
    }

    pub fn drain_deltas(&mut self) -> Vec<PlanDelta> {
        std::mem::take(&mut self.deltas)
    }

    pub fn drain_status_events(&mut self) -> Vec<(PlanObjectId, StatusChange)> {
        std::mem::take(&mut self.status_events)
    }

    pub fn object(&self, id: PlanObjectId) -> Option<&PlanObjectKind> {
        self.objects.get(id).map(|r| &r.kind)
    }

    pub fn object_mut(&mut self, id: PlanObjectId) -> Option<&mut PlanObjectKind> {
        self.objects.get_mut(id).map(|r| &mut r.kind)
    }

    pub fn task(&self, id: PlanObjectId) -> Option<&Task> {
        self.object(id).and_then(|o| o.as_task())
    }

    pub fn task_mut(&mut self, id: PlanObjectId) -> Option<&mut Task> {
        self.object_mut(id).and_then(|o| o.as_task_mut())
    }

    pub fn event(&self, id: PlanObjectId) -> Option<&EventGenerator> {
        self.object(id).and_then(|o| o.as_event())
    }

    pub fn event_mut(&mut self, id: PlanObjectId) -> Option<&mut EventGenerator> {
        self.object_mut(id).and_then(|o| o.as_event_mut())
    }

    pub fn is_finalized(&self, id: PlanObjectId) -> bool {
        self.objects.get(id).map(|r| r.finalized_at.is_some()).unwrap_or(false)
    }

    pub fn has(&self, id: PlanObjectId) -> bool {
        self.tasks.contains(&id) || self.free_events.contains(&id) || self.task_bound_events.contains(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = PlanObjectId> + '_ {
        self.tasks.iter().copied()
    }

    pub fn free_events(&self) -> impl Iterator<Item = PlanObjectId> + '_ {
        self.free_events.iter().copied()
    }

    pub fn bound_events(&self) -> impl Iterator<Item = PlanObjectId> + '_ {
        self.task_bound_events.iter().copied()
    }

    pub fn all_events(&self) -> impl Iterator<Item = PlanObjectId> + '_ {
        self.free_events.iter().copied().chain(self.task_bound_events.iter().copied())
    }

    pub fn is_mission(&self, id: PlanObjectId) -> bool {
        self.mission.contains(&id)
    }

    pub fn is_permanent(&self, id: PlanObjectId) -> bool {
        self.permanent.contains(&id)
    }

    pub(crate) fn require_member(&self, id: PlanObjectId) -> Result<()> {
        if self.has(id) {
            Ok(())
        } else if self.is_finalized(id) {
            Err(PlanError::Finalized(id))
        } else {
            Err(PlanError::NotAMember(id))
        }
    }

    /// Add a task, binding the standard `start`/`stop`/`success`/
    /// `failed` events plus any extra model-defined event names.
    /// Spec §3: "bound events including at least start, stop,
    /// success, failed (and may add model-defined ones)".
    pub fn add_task(&mut self, task: Task, extra_events: &[&str]) -> Result<PlanObjectId> {
        let task_id = self.objects.insert(PlanObjectRecord {
            kind: PlanObjectKind::Task(task),
            finalized_at: None,
        });
        self.tasks.insert(task_id);
        self.deltas.push(PlanDelta::ObjectAdded(task_id));

        let mut names: Vec<&str> = STANDARD_EVENTS.to_vec();
        names.extend(extra_events.iter().copied());
        for name in names {
            let gen = EventGenerator::new(name, true, Owner::Task(task_id));
            let ev_id = self.objects.insert(PlanObjectRecord {
                kind: PlanObjectKind::Event(gen),
                finalized_at: None,
            });
            self.task_bound_events.insert(ev_id);
            self.deltas.push(PlanDelta::ObjectAdded(ev_id));
            if let Some(PlanObjectKind::Task(t)) = self.objects.get_mut(task_id).map(|r| &mut r.kind) {
                t.events.insert(name.to_string(), ev_id);
            }
        }
        self.revision += 1;
        Ok(task_id)
    }

    /// Add a free (task-less) event generator.
    pub fn add_free_event(&mut self, name: impl Into<String>, controllable: bool) -> Result<PlanObjectId> {
        let gen = EventGenerator::new(name, controllable, Owner::Plan);
        let id = self.objects.insert(PlanObjectRecord {
            kind: PlanObjectKind::Event(gen),
            finalized_at: None,
        });
        self.free_events.insert(id);
        self.deltas.push(PlanDelta::ObjectAdded(id));
        self.revision += 1;
        Ok(id)
    }

    fn set_mission(&mut self, task: PlanObjectId, value: bool) -> Result<()> {
        self.require_member(task)?;
        if self.task(task).is_none() {
            return Err(PlanError::InvalidArgument(format!(
                "{} is not a task; only tasks can be mission",
                task
            )));
        }
        let changed = if value {
            self.mission.insert(task)
        } else {
            self.mission.remove(&task)
        };
        if changed {
            self.status_events.push((task, StatusChange::Mission(value)));
            self.deltas.push(PlanDelta::StatusChanged {
                object: task,
                change: StatusChange::Mission(value),
            });
            self.revision += 1;
        }
        Ok(())
    }

    pub fn mark_mission(&mut self, task: PlanObjectId) -> Result<()> {
        self.set_mission(task, true)
    }

    pub fn unmark_mission(&mut self, task: PlanObjectId) -> Result<()> {
        self.set_mission(task, false)
    }

    fn set_permanent(&mut self, obj: PlanObjectId, value: bool) -> Result<()> {
        self.require_member(obj)?;
        let changed = if value {
            self.permanent.insert(obj)
        } else {
            self.permanent.remove(&obj)
        };
        if changed {
            self.status_events.push((obj, StatusChange::Permanent(value)));
            self.deltas.push(PlanDelta::StatusChanged {
                object: obj,
                change: StatusChange::Permanent(value),
            });
            self.revision += 1;
        }
        Ok(())
    }

    pub fn mark_permanent(&mut self, obj: PlanObjectId) -> Result<()> {
        self.set_permanent(obj, true)
    }

    pub fn unmark_permanent(&mut self, obj: PlanObjectId) -> Result<()> {
        self.set_permanent(obj, false)
    }

    /// Remove `obj` from the plan: detach every edge and membership,
    /// set its finalization time, and cascade to bound events when
    /// `obj` is a task (spec §4.2, `remove`).
    pub fn remove(&mut self, obj: PlanObjectId, at_cycle: u64) -> Result<()> {
        self.require_member(obj)?;
        let is_task = self.task(obj).is_some();
        if is_task {
            let event_ids: Vec<PlanObjectId> = self
                .task(obj)
                .map(|t| t.events.values().copied().collect())
                .unwrap_or_default();
            self.relations_task.remove_vertex(obj.to_node_ref());
            self.tasks.remove(&obj);
            self.mission.remove(&obj);
            self.permanent.remove(&obj);
            for ev in event_ids {
                self.finalize_event(ev, at_cycle);
            }
            self.finalize_object(obj, at_cycle);
        } else {
            self.relations_event.remove_vertex(obj.to_node_ref());
            self.free_events.remove(&obj);
            self.permanent.remove(&obj);
            self.finalize_object(obj, at_cycle);
        }
        self.revision += 1;
        Ok(())
    }

    fn finalize_event(&mut self, ev: PlanObjectId, at_cycle: u64) {
        self.relations_event.remove_vertex(ev.to_node_ref());
        self.task_bound_events.remove(&ev);
        self.permanent.remove(&ev);
        if let Some(g) = self.event_mut(ev) {
            g.finalize(at_cycle);
        }
        self.finalize_object(ev, at_cycle);
    }

    fn finalize_object(&mut self, id: PlanObjectId, at_cycle: u64) {
        if let Some(record) = self.objects.get_mut(id) {
            record.finalized_at = Some(at_cycle);
        }
        self.deltas.push(PlanDelta::ObjectFinalized(id));
    }

    pub fn add_task_edge(
        &mut self,
        relation: &RelationId,
        from: PlanObjectId,
        to: PlanObjectId,
        info: Option<EdgeInfo>,
    ) -> Result<AddOutcome> {
        self.require_member(from)?;
        self.require_member(to)?;
        let outcome = self
            .relations_task
            .add_edge(relation, from.to_node_ref(), to.to_node_ref(), info)?;
        if outcome == AddOutcome::Inserted {
            self.deltas.push(PlanDelta::edge_added(relation, from, to));
            self.revision += 1;
        }
        Ok(outcome)
    }

    pub fn remove_task_edge(&mut self, relation: &RelationId, from: PlanObjectId, to: PlanObjectId) -> Result<bool> {
        let removed = self
            .relations_task
            .remove_edge(relation, from.to_node_ref(), to.to_node_ref())?;
        if removed {
            self.deltas.push(PlanDelta::edge_removed(relation, from, to));
            self.revision += 1;
        }
        Ok(removed)
    }

    pub fn add_event_edge(
        &mut self,
        relation: &RelationId,
        from: PlanObjectId,
        to: PlanObjectId,
        info: Option<EdgeInfo>,
    ) -> Result<AddOutcome> {
        self.require_member(from)?;
        self.require_member(to)?;
        let outcome = self
            .relations_event
            .add_edge(relation, from.to_node_ref(), to.to_node_ref(), info)?;
        if outcome == AddOutcome::Inserted {
            self.deltas.push(PlanDelta::edge_added(relation, from, to));
            self.revision += 1;
        }
        Ok(outcome)
    }

    pub fn remove_event_edge(&mut self, relation: &RelationId, from: PlanObjectId, to: PlanObjectId) -> Result<bool> {
        let removed = self
            .relations_event
            .remove_edge(relation, from.to_node_ref(), to.to_node_ref())?;
        if removed {
            self.deltas.push(PlanDelta::edge_removed(relation, from, to));
            self.revision += 1;
        }
        Ok(removed)
    }

    pub fn task_neighbors(&self, relation: &RelationId, v: PlanObjectId, dir: Direction) -> Result<Vec<PlanObjectId>> {
        Ok(self
            .relations_task
            .neighbors(relation, v.to_node_ref(), dir)?
            .into_iter()
            .map(PlanObjectId::from_node_ref)
            .collect())
    }

    pub fn event_neighbors(&self, relation: &RelationId, v: PlanObjectId, dir: Direction) -> Result<Vec<PlanObjectId>> {
        Ok(self
            .relations_event
            .neighbors(relation, v.to_node_ref(), dir)?
            .into_iter()
            .map(PlanObjectId::from_node_ref)
            .collect())
    }

    /// Objects reachable from any mission or permanent task through
    /// any relation (task-space or event-space, including the
    /// task<->bound-event binding itself). Used by the garbage
    /// collector (spec §4.7, step 6).
    pub fn reachable_from_roots(&self) -> HashSet<PlanObjectId> {
        let mut seen: HashSet<PlanObjectId> = HashSet::new();
        let mut stack: Vec<PlanObjectId> = self
            .tasks
            .iter()
            .filter(|t| self.mission.contains(*t) || self.permanent.contains(*t))
            .copied()
            .collect();
        stack.extend(
            self.free_events
                .iter()
                .filter(|e| self.permanent.contains(*e))
                .copied(),
        );
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if let Some(task) = self.task(cur) {
                for ev in task.events.values() {
                    stack.push(*ev);
                }
                for rel in self.relations_task.relations().cloned().collect::<Vec<_>>() {
                    for n in self
                        .relations_task
                        .neighbors(&rel, cur.to_node_ref(), Direction::Outgoing)
                        .unwrap_or_default()
                    {
                        stack.push(PlanObjectId::from_node_ref(n));
                    }
                }
            }
            if let Some(ev) = self.event(cur) {
                if let Owner::Task(owner) = ev.owner {
                    stack.push(owner);
                }
                for rel in self.relations_event.relations().cloned().collect::<Vec<_>>() {
                    for n in self
                        .relations_event
                        .neighbors(&rel, cur.to_node_ref(), Direction::Outgoing)
                        .unwrap_or_default()
                    {
                        stack.push(PlanObjectId::from_node_ref(n));
                    }
                }
            }
        }
        seen
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn remove_sets_finalized_and_clears_membership() {
        let mut plan = Plan::new();
        let id = plan.add_task(Task::new("demo"), &[]).unwrap();
        assert!(plan.has(id));
        plan.remove(id, 1).unwrap();
        assert!(!plan.has(id));
        assert!(plan.is_finalized(id));
        // the object itself remains inspectable after removal.
        assert!(plan.task(id).is_some());
    }

    #[test]
    fn remove_cascades_to_bound_events() {
        let mut plan = Plan::new();
        let id = plan.add_task(Task::new("demo"), &[]).unwrap();
        let start = plan.task(id).unwrap().event("start").unwrap();
        plan.remove(id, 1).unwrap();
        assert!(plan.is_finalized(start));
        assert!(!plan.has(start));
    }

    #[test]
    fn mark_mission_is_idempotent() {
        let mut plan = Plan::new();
        let id = plan.add_task(Task::new("demo"), &[]).unwrap();
        plan.mark_mission(id).unwrap();
        let rev_after_first = plan.revision();
        plan.mark_mission(id).unwrap();
        assert_eq!(plan.revision(), rev_after_first);
        assert_eq!(plan.drain_status_events().len(), 1);
    }

    #[test]
    fn finalized_object_cannot_be_reused_as_edge_endpoint() {
        let mut plan = Plan::new();
        let a = plan.add_task(Task::new("a"), &[]).unwrap();
        let b = plan.add_task(Task::new("b"), &[]).unwrap();
        plan.remove(a, 1).unwrap();
        let err = plan
            .add_task_edge(&relations::depends_on(), a, b, None)
            .unwrap_err();
        assert!(matches!(err, PlanError::Finalized(_)));
    }
}
