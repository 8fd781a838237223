//! Event calling/emission and the per-cycle propagation fixpoint (spec
//! §4.3).
//!
//! Handlers are registered per generator: a handler is
//! `Arc<dyn Fn(...)>` so it can be shared across cycles and call back
//! into the same [`Cycle`] it runs in to queue further calls/emissions.
//! Two registries exist because a generator's *command* (what runs
//! when it is called) and its *handler* (what runs after it emits) are
//! distinct.

use crate::error::{ExecutionError, Result};
use plan_core::{Emission, Plan, PlanObjectId};
use plan_relations::Direction;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub type HandlerFn =
    Arc<dyn Fn(&mut Plan, PlanObjectId, &serde_json::Value, &mut Cycle) -> Result<()> + Send + Sync>;

/// Mutable state threaded through one propagation fixpoint: the
/// pending call/emit sets plus bookkeeping to enforce "a single
/// emission cannot be observed twice in the same cycle" (spec §4.3).
pub struct Cycle {
    now: u64,
    next_seq: u64,
    emit_queue: Vec<QueueItem>,
    call_queue: Vec<QueueItem>,
    emitted_this_cycle: HashSet<PlanObjectId>,
    called_this_cycle: HashSet<PlanObjectId>,
    errors: Vec<ExecutionError>,
}

struct QueueItem {
    generator: PlanObjectId,
    context: serde_json::Value,
    seq: u64,
}

impl Cycle {
    pub fn new(now: u64) -> Self {
        Cycle {
            now,
            next_seq: 0,
            emit_queue: Vec::new(),
            call_queue: Vec::new(),
            emitted_this_cycle: HashSet::new(),
            called_this_cycle: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn queue_emit(&mut self, generator: PlanObjectId, context: serde_json::Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.emit_queue.push(QueueItem { generator, context, seq });
    }

    pub fn queue_call(&mut self, generator: PlanObjectId, context: serde_json::Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.call_queue.push(QueueItem { generator, context, seq });
    }

    pub fn report(&mut self, error: ExecutionError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[ExecutionError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ExecutionError> {
        self.errors
    }
}

/// Per-generator commands (run on `call`) and handlers (run after
/// `emit`), spec §4.3.
#[derive(Default)]
pub struct HandlerRegistry {
    commands: HashMap<PlanObjectId, HandlerFn>,
    handlers: HashMap<PlanObjectId, HandlerFn>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command(&mut self, generator: PlanObjectId, f: HandlerFn) {
        self.commands.insert(generator, f);
    }

    pub fn register_handler(&mut self, generator: PlanObjectId, f: HandlerFn) {
        self.handlers.insert(generator, f);
    }
}

/// Causal ordering used to pick the next queue element: predecessors
/// in the `precedence` relation sort before successors, ties broken by
/// insertion order (spec §4.3, step 3).
fn causal_rank(plan: &Plan) -> HashMap<PlanObjectId, usize> {
    let relation = plan_core::relations::precedence();
    let Ok(graph) = plan.relations_event.graph(&relation) else {
        return HashMap::new();
    };
    graph
        .topological_each()
        .into_iter()
        .enumerate()
        .map(|(rank, node)| (PlanObjectId::from_node_ref(node), rank))
        .collect()
}

fn pop_next(queue: &mut Vec<QueueItem>, rank: &HashMap<PlanObjectId, usize>) -> Option<QueueItem> {
    if queue.is_empty() {
        return None;
    }
    let best = (0..queue.len())
        .min_by_key(|&i| {
            let item = &queue[i];
            (rank.get(&item.generator).copied().unwrap_or(usize::MAX), item.seq)
        })
        .unwrap();
    Some(queue.remove(best))
}

/// Run the fixpoint described in spec §4.3 until both queues are
/// empty, recording every [`ExecutionError`] raised by a handler along
/// the way rather than aborting (propagation continues past a
/// localized failure).
pub fn run_to_fixpoint(plan: &mut Plan, handlers: &HandlerRegistry, cycle: &mut Cycle) {
    let rank = causal_rank(plan);
    loop {
        let mut progressed = false;
        while let Some(item) = pop_next(&mut cycle.emit_queue, &rank) {
            progressed = true;
            deliver_emission(plan, handlers, cycle, item);
        }
        while let Some(item) = pop_next(&mut cycle.call_queue, &rank) {
            progressed = true;
            deliver_call(plan, handlers, cycle, item);
        }
        if !progressed {
            break;
        }
    }
}

fn deliver_emission(plan: &mut Plan, handlers: &HandlerRegistry, cycle: &mut Cycle, item: QueueItem) {
    let generator = item.generator;
    if !cycle.emitted_this_cycle.insert(generator) {
        return; // already observed this cycle; forward_to cycles are tolerated by this guard
    }
    let Some(gen) = plan.event_mut(generator) else { return };
    if gen.state != plan_core::GeneratorState::Added {
        return;
    }
    gen.record_emission(Emission {
        cycle: 0,
        time: cycle.now,
        context: item.context.clone(),
    });
    gen.pending = false;
    gen.emitted_this_cycle = true;

    match plan_temporal::on_emission(plan, generator, cycle.now) {
        Ok(violations) => violations.into_iter().for_each(|v| cycle.report(v.into())),
        Err(err) => cycle.report(err.into()),
    }

    let forward_targets = plan
        .event_neighbors(&plan_core::relations::forward_to(), generator, Direction::Outgoing)
        .unwrap_or_default();
    for target in forward_targets {
        cycle.queue_emit(target, item.context.clone());
    }

    let signal_targets = plan
        .event_neighbors(&plan_core::relations::signals(), generator, Direction::Outgoing)
        .unwrap_or_default();
    for target in signal_targets {
        cycle.queue_call(target, item.context.clone());
    }

    if let Some(handler) = handlers.handlers.get(&generator) {
        if let Err(err) = handler(plan, generator, &item.context, cycle) {
            cycle.report(ExecutionError::LocalizedError {
                origin: generator,
                message: err.to_string(),
            });
        }
    }
}

fn deliver_call(plan: &mut Plan, handlers: &HandlerRegistry, cycle: &mut Cycle, item: QueueItem) {
    let generator = item.generator;
    if !cycle.called_this_cycle.insert(generator) {
        return; // signals cycles are broken once the target has already been called this cycle
    }
    let Some(gen) = plan.event(generator) else { return };
    if !gen.controllable {
        cycle.report(ExecutionError::NotControllable(generator));
        return;
    }
    if let Some(g) = plan.event_mut(generator) {
        g.pending = true;
    }
    // Default command is simply to emit; a registered command runs in
    // addition and may queue further work.
    cycle.queue_emit(generator, item.context.clone());
    if let Some(command) = handlers.commands.get(&generator) {
        if let Err(err) = command(plan, generator, &item.context, cycle) {
            cycle.report(ExecutionError::LocalizedError {
                origin: generator,
                message: err.to_string(),
            });
        }
    }
}

/// `forward_to(src, dst)`: declare non-controllable propagation (spec
/// §4.3).
pub fn forward_to(plan: &mut Plan, src: PlanObjectId, dst: PlanObjectId) -> Result<()> {
    plan.add_event_edge(&plan_core::relations::forward_to(), src, dst, None)?;
    Ok(())
}

/// `signals(src, dst)`: when `src` emits, `dst` is called. Requires
/// `dst.controllable` (spec §4.3).
pub fn signals(plan: &mut Plan, src: PlanObjectId, dst: PlanObjectId) -> Result<()> {
    let controllable = plan
        .event(dst)
        .ok_or(plan_core::PlanError::NotAMember(dst))?
        .controllable;
    if !controllable {
        return Err(ExecutionError::NotControllable(dst));
    }
    plan.add_event_edge(&plan_core::relations::signals(), src, dst, None)?;
    Ok(())
}

/// Clear every generator's `emitted_this_cycle` flag at the start of a
/// new cycle, so [`crate::lifecycle`] can tell which events fired
/// *this* cycle from those that merely fired in a previous one.
pub fn reset_cycle_flags(plan: &mut Plan) {
    for id in plan.all_events().collect::<Vec<_>>() {
        if let Some(g) = plan.event_mut(id) {
            g.emitted_this_cycle = false;
        }
    }
}

pub fn is_live(plan: &Plan, generator: PlanObjectId) -> bool {
    match plan.event(generator) {
        Some(g) => !matches!(g.state, plan_core::GeneratorState::Finalized),
        None => false,
    }
}

