//! Log-stream replay (spec §6, "Log stream").
//!
//! The engine's `plan-core` deltas are cycle-by-cycle snapshots of
//! what changed. A [`Replayer`] reconstructs enough of a plan's shape
//! from a starting empty state to answer "what tasks/events currently
//! exist and what relations hold between them" purely from the delta
//! stream, without needing direct access to the live `Plan`.

use plan_core::{PlanDelta, PlanObjectId, StatusChange};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayedObject {
    pub mission: bool,
    pub permanent: bool,
    pub finalized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Replayer {
    objects: HashMap<PlanObjectId, ReplayedObject>,
    edges: HashSet<(String, PlanObjectId, PlanObjectId)>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, delta: &PlanDelta) {
        match delta {
            PlanDelta::ObjectAdded(id) => {
                self.objects.entry(*id).or_default();
            }
            PlanDelta::ObjectFinalized(id) => {
                self.objects.entry(*id).or_default().finalized = true;
            }
            PlanDelta::EdgeAdded { relation, from, to } => {
                self.edges.insert((relation.clone(), *from, *to));
            }
            PlanDelta::EdgeRemoved { relation, from, to } => {
                self.edges.remove(&(relation.clone(), *from, *to));
            }
            PlanDelta::StatusChanged { object, change } => {
                let entry = self.objects.entry(*object).or_default();
                match change {
                    StatusChange::Mission(v) => entry.mission = *v,
                    StatusChange::Permanent(v) => entry.permanent = *v,
                }
            }
        }
    }

    pub fn apply_all<'a>(&mut self, deltas: impl IntoIterator<Item = &'a PlanDelta>) {
        for delta in deltas {
            self.apply(delta);
        }
    }

    pub fn object(&self, id: PlanObjectId) -> Option<&ReplayedObject> {
        self.objects.get(&id)
    }

    pub fn has_edge(&self, relation: &str, from: PlanObjectId, to: PlanObjectId) -> bool {
        self.edges.contains(&(relation.to_string(), from, to))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::Plan;

    #[test]
    fn replay_reconstructs_mission_and_finalization() {
        let mut plan = Plan::new();
        let task = plan.add_task(plan_core::Task::new("demo"), &[]).unwrap();
        plan.mark_mission(task).unwrap();
        plan.remove(task, 1).unwrap();
        let deltas = plan.drain_deltas();

        let mut replayer = Replayer::new();
        replayer.apply_all(&deltas);
        let replayed = replayer.object(task).unwrap();
        assert!(replayed.mission);
        assert!(replayed.finalized);
    }

    #[test]
    fn replay_tracks_edges() {
        let mut plan = Plan::new();
        let a = plan.add_task(plan_core::Task::new("a"), &[]).unwrap();
        let b = plan.add_task(plan_core::Task::new("b"), &[]).unwrap();
        plan.add_task_edge(&plan_core::relations::depends_on(), a, b, None).unwrap();
        let deltas = plan.drain_deltas();

        let mut replayer = Replayer::new();
        replayer.apply_all(&deltas);
        assert!(replayer.has_edge("depends_on", a, b));

        plan.remove_task_edge(&plan_core::relations::depends_on(), a, b).unwrap();
        replayer.apply_all(&plan.drain_deltas());
        assert!(!replayer.has_edge("depends_on", a, b));
    }
}
