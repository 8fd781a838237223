//! The plan's deadline queue (spec §4.5, "EventDeadlines").
//!
//! This module only stores and drains deadline entries; the logic
//! that decides *when* to add one (temporal constraint propagation)
//! lives in `plan-temporal`, which is layered above `plan-core` and
//! drives this queue through [`Plan::deadlines_mut`](crate::Plan::deadlines_mut).

use crate::ids::PlanObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineEntry {
    pub deadline_time: u64,
    pub source_emission_time: u64,
    pub source: PlanObjectId,
    pub target: PlanObjectId,
}

/// A list of `(deadline_time, source_emission, target_generator)`
/// sorted by deadline, per spec §4.5.
#[derive(Debug, Clone, Default)]
pub struct EventDeadlines {
    entries: Vec<DeadlineEntry>,
}

impl EventDeadlines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: DeadlineEntry) {
        let pos = self
            .entries
            .partition_point(|e| e.deadline_time <= entry.deadline_time);
        self.entries.insert(pos, entry);
    }

    /// Remove at most one pending deadline registered by `source`
    /// whose deadline is strictly after `after_time` (spec §4.5: "On
    /// every emission of `b`, remove at most one pending deadline
    /// registered by `a` whose deadline is after the emission time").
    pub fn remove_for(&mut self, source: PlanObjectId, after_time: u64) -> bool {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.source == source && e.deadline_time > after_time)
        {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Drain and return every entry whose deadline is `<= now`.
    pub fn missed(&mut self, now: u64) -> Vec<DeadlineEntry> {
        let split = self.entries.partition_point(|e| e.deadline_time <= now);
        self.entries.drain(0..split).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeadlineEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(i: u32) -> PlanObjectId {
        // Tests only need a stable, distinguishable id; construct via
        // round-trip through a NodeRef since the fields are private.
        PlanObjectId::from_node_ref(plan_relations::NodeRef(i as u64))
    }

    #[test]
    fn missed_drains_only_overdue_entries() {
        let mut dl = EventDeadlines::new();
        dl.add(DeadlineEntry {
            deadline_time: 10,
            source_emission_time: 0,
            source: obj(1),
            target: obj(2),
        });
        dl.add(DeadlineEntry {
            deadline_time: 20,
            source_emission_time: 0,
            source: obj(1),
            target: obj(2),
        });
        let missed = dl.missed(15);
        assert_eq!(missed.len(), 1);
        assert_eq!(dl.len(), 1);
    }

    #[test]
    fn remove_for_takes_at_most_one() {
        let mut dl = EventDeadlines::new();
        for t in [5, 15, 25] {
            dl.add(DeadlineEntry {
                deadline_time: t,
                source_emission_time: 0,
                source: obj(1),
                target: obj(2),
            });
        }
        assert!(dl.remove_for(obj(1), 10));
        assert_eq!(dl.len(), 2);
    }
}
