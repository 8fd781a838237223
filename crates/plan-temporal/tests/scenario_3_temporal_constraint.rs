//! `a.add_temporal_constraint(b, 1, 3)`: emitting `a` without `b`
//! following inside the window raises a missed-deadline error;
//! emitting both inside a later window raises nothing.

use plan_temporal::{add_temporal_constraint, drain_missed, on_emission, TemporalError};

fn bound_event(plan: &mut plan_core::Plan) -> plan_core::PlanObjectId {
    plan.add_free_event("generic", true).unwrap()
}

#[test]
fn scenario_3_missed_then_satisfied_deadline() {
    let mut plan = plan_core::Plan::new();
    let a = bound_event(&mut plan);
    let b = bound_event(&mut plan);
    add_temporal_constraint(&mut plan, a, b, 1, 3).unwrap();

    plan.event_mut(a).unwrap().record_emission(plan_core::Emission {
        cycle: 0,
        time: 0,
        context: serde_json::Value::Null,
    });
    on_emission(&mut plan, a, 0).unwrap();

    let missed = drain_missed(&mut plan, 4);
    assert_eq!(
        missed,
        vec![TemporalError::MissedDeadlineError {
            generator: b,
            from: a,
            deadline: 3,
        }]
    );

    plan.event_mut(a).unwrap().record_emission(plan_core::Emission {
        cycle: 1,
        time: 10,
        context: serde_json::Value::Null,
    });
    on_emission(&mut plan, a, 10).unwrap();

    plan.event_mut(b).unwrap().record_emission(plan_core::Emission {
        cycle: 1,
        time: 12,
        context: serde_json::Value::Null,
    });
    let errors = on_emission(&mut plan, b, 12).unwrap();
    assert!(errors.is_empty());
    assert!(plan.deadlines().is_empty());
}
