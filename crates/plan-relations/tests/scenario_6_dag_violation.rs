//! A `dag` graph rejects any edge that would close a cycle, and
//! leaves the graph exactly as it was before the rejected call.

use plan_relations::{NodeRef, RelationError, RelationGraph, RelationPolicy};

#[test]
fn dag_rejects_cycles_and_leaves_graph_unchanged() {
    let mut g = RelationGraph::new("depends_on", RelationPolicy::weak_dag());
    g.add_edge(NodeRef(1), NodeRef(2), None).unwrap();
    g.add_edge(NodeRef(2), NodeRef(3), None).unwrap();
    let err = g.add_edge(NodeRef(3), NodeRef(1), None).unwrap_err();
    assert!(matches!(err, RelationError::CycleFound { .. }));
    assert!(g.has_edge(NodeRef(1), NodeRef(2)));
    assert!(!g.has_edge(NodeRef(3), NodeRef(1)));
}
