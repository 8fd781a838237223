//! Relation class registry: declares every relation a plan will use,
//! its policy, and its hierarchy links.
//!
//! Per spec §9 ("Module-level state"), this is an explicit registry
//! constructed once (typically as part of a `CoreContext`) and handed
//! to every [`crate::space::RelationSpace`] — there is no implicit
//! global relation table.

use crate::error::{RelationError, Result};
use crate::policy::RelationPolicy;
use std::collections::HashMap;

/// Stable identifier for a relation class, e.g. `"depends_on"`,
/// `"precedence"`, `"causal_link"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub String);

impl RelationId {
    pub fn new(name: impl Into<String>) -> Self {
        RelationId(name.into())
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationId {
    fn from(s: &str) -> Self {
        RelationId(s.to_string())
    }
}

/// A declared relation class: its policy plus, if any, which broader
/// relation it is a subset of (spec §3, "hierarchy").
#[derive(Debug, Clone)]
pub struct RelationClass {
    pub id: RelationId,
    pub policy: RelationPolicy,
    /// The superset this relation is a subset of, if any. Inserting
    /// into this relation also inserts into the superset; removing
    /// from the superset also removes from this relation.
    pub subset_of: Option<RelationId>,
}

impl RelationClass {
    pub fn new(id: impl Into<RelationId>, policy: RelationPolicy) -> Self {
        RelationClass {
            id: id.into(),
            policy,
            subset_of: None,
        }
    }

    pub fn subset_of(mut self, superset: impl Into<RelationId>) -> Self {
        self.subset_of = Some(superset.into());
        self
    }
}

/// Registry of declared relation classes plus the hierarchy links
/// between them, shared (by reference) across every
/// [`crate::space::RelationSpace`] instantiated from it.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    classes: HashMap<RelationId, RelationClass>,
    /// superset -> direct subsets, derived from `subset_of` links, kept
    /// in insertion order for deterministic propagation.
    subsets_of: HashMap<RelationId, Vec<RelationId>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        RelationRegistry::default()
    }

    pub fn register(&mut self, class: RelationClass) -> Result<()> {
        if self.classes.contains_key(&class.id) {
            return Err(RelationError::DuplicateRelation(class.id.0.clone()));
        }
        if let Some(superset) = &class.subset_of {
            if !self.classes.contains_key(superset) && superset != &class.id {
                return Err(RelationError::UnknownHierarchyPeer(
                    class.id.0.clone(),
                    superset.0.clone(),
                ));
            }
            self.subsets_of
                .entry(superset.clone())
                .or_default()
                .push(class.id.clone());
        }
        self.classes.insert(class.id.clone(), class);
        Ok(())
    }

    pub fn get(&self, id: &RelationId) -> Result<&RelationClass> {
        self.classes
            .get(id)
            .ok_or_else(|| RelationError::UnknownRelation(id.0.clone()))
    }

    pub fn direct_subsets(&self, id: &RelationId) -> &[RelationId] {
        self.subsets_of.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn ids(&self) -> impl Iterator<Item = &RelationId> {
        self.classes.keys()
    }
}
