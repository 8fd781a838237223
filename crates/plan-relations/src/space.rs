//! A collection of relation graphs sharing one [`RelationRegistry`],
//! with automatic hierarchy propagation.
//!
//! A [`crate::space::RelationSpace`] is what a plan actually owns: one
//! instance per declared relation (spec §3, "A plan owns one instance
//! of each declared relation"), with `add_edge`/`remove_edge`
//! propagating across subset/superset links automatically so callers
//! never have to remember to touch both graphs themselves.

use crate::error::Result;
use crate::graph::{AddOutcome, Direction, EdgeInfo, NodeRef, RelationGraph};
use crate::registry::{RelationId, RelationRegistry};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct RelationSpace {
    registry: Arc<RelationRegistry>,
    graphs: HashMap<RelationId, RelationGraph>,
}

impl RelationSpace {
    /// Instantiate one empty [`RelationGraph`] per class declared in
    /// `registry`.
    pub fn new(registry: Arc<RelationRegistry>) -> Self {
        let mut graphs = HashMap::new();
        for id in registry.ids() {
            let class = registry.get(id).expect("just listed by ids()");
            graphs.insert(id.clone(), RelationGraph::new(id.0.clone(), class.policy));
        }
        RelationSpace { registry, graphs }
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    pub fn graph(&self, relation: &RelationId) -> Result<&RelationGraph> {
        self.registry.get(relation)?;
        Ok(self.graphs.get(relation).expect("registered relations always have a graph"))
    }

    pub fn graph_mut(&mut self, relation: &RelationId) -> Result<&mut RelationGraph> {
        self.registry.get(relation)?;
        Ok(self.graphs.get_mut(relation).expect("registered relations always have a graph"))
    }

    /// Add an edge to `relation`, propagating upward to any superset
    /// it is declared `subset_of` (spec §4.1: "`add_edge` for a subset
    /// also adds to the superset").
    pub fn add_edge(
        &mut self,
        relation: &RelationId,
        from: NodeRef,
        to: NodeRef,
        info: Option<EdgeInfo>,
    ) -> Result<AddOutcome> {
        let class = self.registry.get(relation)?.clone();
        let outcome = self
            .graphs
            .get_mut(relation)
            .expect("registered")
            .add_edge(from, to, info.clone())?;
        if let Some(superset) = &class.subset_of {
            self.add_edge(superset, from, to, info)?;
        }
        Ok(outcome)
    }

    /// Remove an edge from `relation`, propagating downward to every
    /// direct subset that held it (spec §4.1: "`remove_edge` removes
    /// the edge and, for a hierarchy superset, also removes from any
    /// subset that held it").
    pub fn remove_edge(&mut self, relation: &RelationId, from: NodeRef, to: NodeRef) -> Result<bool> {
        self.registry.get(relation)?;
        let removed = self
            .graphs
            .get_mut(relation)
            .expect("registered")
            .remove_edge(from, to);
        if removed {
            let subsets: Vec<RelationId> = self.registry.direct_subsets(relation).to_vec();
            for subset in subsets {
                self.remove_edge(&subset, from, to)?;
            }
        }
        Ok(removed)
    }

    pub fn neighbors(&self, relation: &RelationId, v: NodeRef, direction: Direction) -> Result<Vec<NodeRef>> {
        Ok(self.graph(relation)?.neighbors(v, direction))
    }

    pub fn edge_info(&self, relation: &RelationId, from: NodeRef, to: NodeRef) -> Result<Option<&EdgeInfo>> {
        Ok(self.graph(relation)?.edge_info(from, to))
    }

    pub fn has_edge(&self, relation: &RelationId, from: NodeRef, to: NodeRef) -> Result<bool> {
        Ok(self.graph(relation)?.has_edge(from, to))
    }

    /// Remove every edge touching `v` across every relation in this
    /// space (used when a plan object is removed from the plan).
    pub fn remove_vertex(&mut self, v: NodeRef) {
        for graph in self.graphs.values_mut() {
            graph.remove_vertex(v);
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationId> {
        self.graphs.keys()
    }
}
