//! `p --depends_on--> old` (weak), `p --err_handled_by--> old`
//! (strong), `old --depends_on--> c`: replacing `old` with `new` must
//! move the weak edge, leave the strong edge on `old`, and leave the
//! edge where `old` is itself the parent untouched.

use plan_core::relations::{depends_on, err_handled_by};
use plan_core::{Plan, ReplacementFilter, Task};
use plan_relations::Direction;

#[test]
fn scenario_2_weak_vs_strong_replacement() {
    let mut plan = Plan::new();
    let p = plan.add_task(Task::new("p"), &[]).unwrap();
    let old = plan.add_task(Task::new("worker"), &[]).unwrap();
    let new = plan.add_task(Task::new("worker"), &[]).unwrap();
    let c = plan.add_task(Task::new("c"), &[]).unwrap();

    plan.add_task_edge(&depends_on(), p, old, None).unwrap();
    plan.add_task_edge(&err_handled_by(), p, old, None).unwrap();
    plan.add_task_edge(&depends_on(), old, c, None).unwrap();

    plan.replace_task(old, new, &ReplacementFilter::new()).unwrap();

    assert!(plan.task_neighbors(&depends_on(), p, Direction::Outgoing).unwrap().contains(&new));
    assert!(!plan.task_neighbors(&depends_on(), p, Direction::Outgoing).unwrap().contains(&old));
    assert!(plan.task_neighbors(&err_handled_by(), p, Direction::Outgoing).unwrap().contains(&old));
    assert!(!plan.task_neighbors(&err_handled_by(), p, Direction::Outgoing).unwrap().contains(&new));
    assert!(plan.task_neighbors(&depends_on(), old, Direction::Outgoing).unwrap().contains(&c));
}
