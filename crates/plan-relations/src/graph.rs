//! A single directed relation graph.
//!
//! [`RelationGraph`] implements the uniform API described in spec
//! §4.1: vertices are opaque [`NodeRef`] handles (stable arena indices
//! owned by whoever embeds this substrate — see spec §9's guidance to
//! use "arena-of-nodes + stable indices" rather than raw pointers),
//! edges may carry an `info` payload, and mutation always goes
//! through `add_edge`/`remove_edge` so that `dag` and `embeds_info`
//! are enforced uniformly.

use crate::error::{RelationError, Result};
use crate::policy::RelationPolicy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Opaque handle to a vertex. Callers (typically `plan-core`'s plan
/// object arena) are responsible for allocating and reusing these;
/// the substrate never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef(pub u64);

/// Opaque edge payload. Left as `serde_json::Value` per spec's
/// "opaque to the substrate" requirement — the substrate never reads
/// the value except to compare it for equality or run the relation's
/// merge function.
pub type EdgeInfo = serde_json::Value;

/// Which side of an edge to enumerate from [`RelationGraph::neighbors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Result of a successful [`RelationGraph::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    AlreadyExisted,
}

pub type MergeFn = Arc<dyn Fn(&EdgeInfo, &EdgeInfo) -> Result<EdgeInfo> + Send + Sync>;

/// One relation class's edge storage.
///
/// Adjacency is kept as insertion-ordered `Vec<NodeRef>` rather than a
/// hash set: spec §4.1 requires `topological_each` to be "stable
/// across ties; tie-break: insertion order", so the order must be
/// recoverable cheaply rather than reconstructed from timestamps.
#[derive(Clone)]
pub struct RelationGraph {
    name: String,
    policy: RelationPolicy,
    merge_fn: Option<MergeFn>,
    forward: HashMap<NodeRef, Vec<NodeRef>>,
    backward: HashMap<NodeRef, Vec<NodeRef>>,
    info: HashMap<(NodeRef, NodeRef), EdgeInfo>,
    insertion_order: Vec<(NodeRef, NodeRef)>,
}

impl RelationGraph {
    pub fn new(name: impl Into<String>, policy: RelationPolicy) -> Self {
        RelationGraph {
            name: name.into(),
            policy,
            merge_fn: None,
            forward: HashMap::new(),
            backward: HashMap::new(),
            info: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    /// Attach a merge function used when `embeds_info` and an edge is
    /// re-inserted with a different payload; default behaviour without
    /// one is "equality required" (spec §9, "Info merging in relations").
    pub fn with_merge_fn(mut self, f: MergeFn) -> Self {
        self.merge_fn = Some(f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> RelationPolicy {
        self.policy
    }

    pub fn has_edge(&self, from: NodeRef, to: NodeRef) -> bool {
        self.forward
            .get(&from)
            .map(|v| v.contains(&to))
            .unwrap_or(false)
    }

    pub fn edge_info(&self, from: NodeRef, to: NodeRef) -> Option<&EdgeInfo> {
        self.info.get(&(from, to))
    }

    /// Add an edge, enforcing `dag` and `embeds_info` per spec §4.1.
    pub fn add_edge(
        &mut self,
        from: NodeRef,
        to: NodeRef,
        info: Option<EdgeInfo>,
    ) -> Result<AddOutcome> {
        if self.has_edge(from, to) {
            if self.policy.embeds_info {
                self.reconcile_info(from, to, info)?;
            }
            return Ok(AddOutcome::AlreadyExisted);
        }
        if self.policy.dag && from != to && self.would_create_cycle(from, to) {
            tracing::warn!(relation = %self.name, ?from, ?to, "edge rejected, would create a cycle");
            return Err(RelationError::CycleFound {
                relation: self.name.clone(),
                from,
                to,
            });
        }
        self.forward.entry(from).or_default().push(to);
        self.backward.entry(to).or_default().push(from);
        // Ensure isolated endpoints still have empty adjacency lists so
        // neighbors()/topological_each() see every vertex that has ever
        // touched this relation.
        self.forward.entry(to).or_default();
        self.backward.entry(from).or_default();
        if let Some(info) = info {
            self.info.insert((from, to), info);
        }
        self.insertion_order.push((from, to));
        tracing::trace!(relation = %self.name, ?from, ?to, "edge inserted");
        Ok(AddOutcome::Inserted)
    }

    fn reconcile_info(&mut self, from: NodeRef, to: NodeRef, info: Option<EdgeInfo>) -> Result<()> {
        let Some(new_info) = info else { return Ok(()) };
        match self.info.get(&(from, to)).cloned() {
            None => {
                self.info.insert((from, to), new_info);
                Ok(())
            }
            Some(existing) if existing == new_info => Ok(()),
            Some(existing) => {
                if let Some(merge) = &self.merge_fn {
                    let merged = merge(&existing, &new_info)?;
                    self.info.insert((from, to), merged);
                    Ok(())
                } else {
                    Err(RelationError::InfoConflict {
                        relation: self.name.clone(),
                        from,
                        to,
                    })
                }
            }
        }
    }

    /// Remove the edge `from -> to`, if present. Returns whether it
    /// existed. Hierarchy propagation (removing from subsets too) is
    /// handled one level up by [`crate::space::RelationSpace`].
    pub fn remove_edge(&mut self, from: NodeRef, to: NodeRef) -> bool {
        let removed = if let Some(v) = self.forward.get_mut(&from) {
            let before = v.len();
            v.retain(|x| *x != to);
            before != v.len()
        } else {
            false
        };
        if removed {
            if let Some(v) = self.backward.get_mut(&to) {
                v.retain(|x| *x != from);
            }
            self.info.remove(&(from, to));
            self.insertion_order.retain(|e| *e != (from, to));
        }
        removed
    }

    /// Remove every edge touching `v`, in either direction.
    pub fn remove_vertex(&mut self, v: NodeRef) {
        let outs: Vec<NodeRef> = self.forward.get(&v).cloned().unwrap_or_default();
        let ins: Vec<NodeRef> = self.backward.get(&v).cloned().unwrap_or_default();
        for to in outs {
            self.remove_edge(v, to);
        }
        for from in ins {
            self.remove_edge(from, v);
        }
        self.forward.remove(&v);
        self.backward.remove(&v);
    }

    pub fn neighbors(&self, v: NodeRef, direction: Direction) -> Vec<NodeRef> {
        match direction {
            Direction::Outgoing => self.forward.get(&v).cloned().unwrap_or_default(),
            Direction::Incoming => self.backward.get(&v).cloned().unwrap_or_default(),
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.forward.keys().copied()
    }

    fn would_create_cycle(&self, from: NodeRef, to: NodeRef) -> bool {
        // Adding from->to creates a cycle iff `from` is already
        // reachable from `to`.
        let mut seen = HashSet::new();
        let mut stack = VecDeque::new();
        stack.push_back(to);
        while let Some(cur) = stack.pop_front() {
            if cur == from {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            if let Some(next) = self.forward.get(&cur) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    /// Visit vertices in a topological order, ties broken by
    /// insertion order of the edges that first introduced each
    /// vertex. Only meaningful (and only guaranteed acyclic) when
    /// `policy.dag` is set; on a non-DAG graph this still terminates
    /// by breaking cycles at an arbitrary already-visited vertex.
    pub fn topological_each(&self) -> Vec<NodeRef> {
        let mut indegree: HashMap<NodeRef, usize> = HashMap::new();
        for v in self.forward.keys() {
            indegree.entry(*v).or_insert(0);
        }
        for tos in self.forward.values() {
            for to in tos {
                *indegree.entry(*to).or_insert(0) += 1;
            }
        }
        // Stable vertex enumeration order: first appearance in
        // insertion_order, then any vertex that never appeared in an
        // edge (isolated), in arbitrary-but-deterministic (sorted) order.
        let mut order: Vec<NodeRef> = Vec::new();
        let mut seen = HashSet::new();
        for (a, b) in &self.insertion_order {
            for v in [*a, *b] {
                if seen.insert(v) {
                    order.push(v);
                }
            }
        }
        let mut isolated: Vec<NodeRef> = indegree
            .keys()
            .copied()
            .filter(|v| !seen.contains(v))
            .collect();
        isolated.sort();
        order.extend(isolated);

        let mut result = Vec::with_capacity(order.len());
        let mut ready: VecDeque<NodeRef> = VecDeque::new();
        let mut remaining = indegree.clone();
        let mut queued: HashSet<NodeRef> = HashSet::new();
        for v in &order {
            if remaining.get(v).copied().unwrap_or(0) == 0 && queued.insert(*v) {
                ready.push_back(*v);
            }
        }
        while let Some(v) = ready.pop_front() {
            result.push(v);
            if let Some(tos) = self.forward.get(&v) {
                for to in tos {
                    if let Some(d) = remaining.get_mut(to) {
                        *d = d.saturating_sub(1);
                        if *d == 0 && queued.insert(*to) {
                            ready.push_back(*to);
                        }
                    }
                }
            }
        }
        // Any vertex not emitted was on a cycle (non-DAG graph); append
        // the remainder in stable order rather than dropping it.
        for v in order {
            if !result.contains(&v) {
                result.push(v);
            }
        }
        result
    }

    pub fn copy_to(&self, other: &mut RelationGraph) {
        for (from, to) in &self.insertion_order {
            let info = self.info.get(&(*from, *to)).cloned();
            let _ = other.add_edge(*from, *to, info);
        }
    }

    /// Merge every edge of `other` into `self`, applying the merge
    /// function (or equality check) on conflicts.
    pub fn merge(&mut self, other: &RelationGraph) -> Result<()> {
        for (from, to) in &other.insertion_order {
            let info = other.info.get(&(*from, *to)).cloned();
            self.add_edge(*from, *to, info)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
        self.info.clear();
        self.insertion_order.clear();
    }

    pub fn edge_count(&self) -> usize {
        self.insertion_order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RelationPolicy;

    fn n(i: u64) -> NodeRef {
        NodeRef(i)
    }

    #[test]
    fn embeds_info_requires_equal_payload_without_merge() {
        let mut g = RelationGraph::new("temporal", RelationPolicy {
            embeds_info: true,
            ..RelationPolicy::weak()
        });
        g.add_edge(n(1), n(2), Some(serde_json::json!({"min": 1}))).unwrap();
        let err = g
            .add_edge(n(1), n(2), Some(serde_json::json!({"min": 2})))
            .unwrap_err();
        assert!(matches!(err, RelationError::InfoConflict { .. }));
    }

    #[test]
    fn topological_each_is_stable_on_ties() {
        let mut g = RelationGraph::new("r", RelationPolicy::weak_dag());
        g.add_edge(n(10), n(20), None).unwrap();
        g.add_edge(n(30), n(20), None).unwrap();
        let order = g.topological_each();
        let pos = |x: NodeRef| order.iter().position(|v| *v == x).unwrap();
        assert!(pos(n(10)) < pos(n(20)));
        assert!(pos(n(30)) < pos(n(20)));
        // insertion order tie-break: 10 was introduced before 30.
        assert!(pos(n(10)) < pos(n(30)));
    }
}
