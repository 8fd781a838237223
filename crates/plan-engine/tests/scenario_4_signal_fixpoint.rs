//! `forward_to(e1, e2)`, `signals(e1, e3)` where `e3` calls `emit(e4)`
//! on invocation: emitting `e1` must run `e1, e2, e3, e4` to a
//! fixpoint, each exactly once, respecting forwarding/signal/command
//! causal order.

use plan_core::{Plan, PlanObjectId, PlanObjectKind};
use plan_engine::{forward_to, run_to_fixpoint, signals, Cycle, HandlerRegistry};
use std::sync::{Arc, Mutex};

fn free_added_event(plan: &mut Plan, controllable: bool) -> PlanObjectId {
    let id = plan.add_free_event("e", controllable).unwrap();
    if let Some(PlanObjectKind::Event(g)) = plan.object_mut(id) {
        g.state = plan_core::GeneratorState::Added;
    }
    id
}

#[test]
fn scenario_4_signal_fixpoint() {
    let mut plan = Plan::new();
    let e1 = free_added_event(&mut plan, true);
    let e2 = free_added_event(&mut plan, true);
    let e3 = free_added_event(&mut plan, true);
    let e4 = free_added_event(&mut plan, true);

    forward_to(&mut plan, e1, e2).unwrap();
    signals(&mut plan, e1, e3).unwrap();

    let order: Arc<Mutex<Vec<PlanObjectId>>> = Arc::new(Mutex::new(Vec::new()));
    let mut handlers = HandlerRegistry::new();
    for gen in [e1, e2, e3, e4] {
        let o = order.clone();
        handlers.register_handler(
            gen,
            Arc::new(move |_plan, g, _ctx, _cycle| {
                o.lock().unwrap().push(g);
                Ok(())
            }),
        );
    }
    handlers.register_command(
        e3,
        Arc::new(move |_plan, _gen, _ctx, cycle: &mut Cycle| {
            cycle.queue_emit(e4, serde_json::Value::Null);
            Ok(())
        }),
    );

    let mut cycle = Cycle::new(0);
    cycle.queue_emit(e1, serde_json::Value::Null);
    run_to_fixpoint(&mut plan, &handlers, &mut cycle);
    assert!(cycle.errors().is_empty());

    for e in [e1, e2, e3, e4] {
        assert!(plan.event(e).unwrap().emitted());
    }
    let seen = order.lock().unwrap().clone();
    let pos = |x: PlanObjectId| seen.iter().position(|v| *v == x).unwrap();
    assert!(pos(e1) < pos(e2));
    assert!(pos(e1) < pos(e3));
    assert!(pos(e3) < pos(e4));
}
