//! Event generators: named, repeatable, instantaneous event sources
//! (spec §3, "Event generator").

use crate::ids::PlanObjectId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lifecycle of one event generator (spec §4.3, "Generator state
/// machine"): `unattached -> free|bound -> added -> finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorState {
    Unattached,
    Free,
    Bound,
    Added,
    Finalized,
}

/// What a generator is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Plan,
    Task(PlanObjectId),
}

/// One recorded firing of a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Logical cycle number the emission happened in (see
    /// `plan-engine`'s cycle counter); used to enforce "a single
    /// emission cannot be observed twice in the same cycle".
    pub cycle: u64,
    /// Monotonic emission sequence number, used for deadline math and
    /// tie-breaking within a cycle.
    pub time: u64,
    pub context: serde_json::Value,
}

/// Default cap on retained history entries. Spec's non-goals exclude
/// persistence of historical logs; the log stream (spec §6), not
/// in-memory history, is the durable record, so history here is a
/// small ring buffer for temporal-constraint and diagnostic lookback.
pub const DEFAULT_HISTORY_CAP: usize = 256;

#[derive(Debug, Clone)]
pub struct EventGenerator {
    pub name: String,
    pub controllable: bool,
    pub owner: Owner,
    pub state: GeneratorState,
    history: VecDeque<Emission>,
    history_cap: usize,
    pub pending: bool,
    pub emitted_this_cycle: bool,
    pub finalized_at: Option<u64>,
}

impl EventGenerator {
    /// A freshly constructed generator is already part of the plan
    /// (there is no separate "attach" step between construction and
    /// `Plan::add_task`/`add_free_event`), so it starts out `added`
    /// rather than merely `free`/`bound` — emissions record
    /// immediately rather than waiting on a transition nothing in
    /// this engine ever performs.
    pub fn new(name: impl Into<String>, controllable: bool, owner: Owner) -> Self {
        EventGenerator {
            name: name.into(),
            controllable,
            owner,
            state: GeneratorState::Added,
            history: VecDeque::new(),
            history_cap: DEFAULT_HISTORY_CAP,
            pending: false,
            emitted_this_cycle: false,
            finalized_at: None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.owner, Owner::Plan)
    }

    pub fn emitted(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn last_emission(&self) -> Option<&Emission> {
        self.history.back()
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &Emission> {
        self.history.iter()
    }

    /// Record an emission. Only valid while `state == Added`, per the
    /// generator state machine.
    pub fn record_emission(&mut self, emission: Emission) {
        if self.history.len() >= self.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(emission);
    }

    pub fn finalize(&mut self, at_cycle: u64) {
        self.state = GeneratorState::Finalized;
        self.finalized_at = Some(at_cycle);
        self.pending = false;
    }
}
