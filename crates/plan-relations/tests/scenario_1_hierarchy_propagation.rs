//! `Precedence ⊃ CausalLink`: adding/removing an edge on either graph
//! must propagate across the hierarchy link automatically.

use plan_relations::{RelationClass, RelationId, RelationPolicy, RelationRegistry, RelationSpace};
use std::sync::Arc;

fn build_hierarchy() -> RelationSpace {
    let mut reg = RelationRegistry::new();
    reg.register(RelationClass::new("precedence", RelationPolicy::weak())).unwrap();
    reg.register(RelationClass::new("causal_link", RelationPolicy::weak()).subset_of("precedence"))
        .unwrap();
    RelationSpace::new(Arc::new(reg))
}

#[test]
fn hierarchy_propagation_scenario_1() {
    let mut space = build_hierarchy();
    let a = plan_relations::NodeRef(1);
    let b = plan_relations::NodeRef(2);
    let causal_link = RelationId::new("causal_link");
    let precedence = RelationId::new("precedence");

    space.add_edge(&causal_link, a, b, None).unwrap();
    assert!(space.has_edge(&precedence, a, b).unwrap());
    assert!(space.has_edge(&causal_link, a, b).unwrap());

    space.remove_edge(&precedence, a, b).unwrap();
    assert!(!space.has_edge(&precedence, a, b).unwrap());
    assert!(!space.has_edge(&causal_link, a, b).unwrap());
}
