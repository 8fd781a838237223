//! Error types for the relation substrate.
//!
//! These are validation errors in the sense of spec §7: they are
//! always raised synchronously to the caller that attempted the
//! mutation and never enter fault-response propagation.

use crate::graph::NodeRef;
use thiserror::Error;

/// Errors raised by [`crate::graph::RelationGraph`] and
/// [`crate::space::RelationSpace`] operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelationError {
    /// `add_edge` would create a cycle in a `dag` graph.
    #[error("adding edge {from:?} -> {to:?} in relation '{relation}' would create a cycle")]
    CycleFound {
        relation: String,
        from: NodeRef,
        to: NodeRef,
    },

    /// The edge already exists with a different, non-equal `info`
    /// payload on a graph declared `embeds_info`, and no merge
    /// function resolved the conflict.
    #[error("edge {from:?} -> {to:?} in relation '{relation}' already carries incompatible info")]
    InfoConflict {
        relation: String,
        from: NodeRef,
        to: NodeRef,
    },

    /// Referenced a relation class that was never registered.
    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    /// A hierarchy link referenced an unknown subset or superset.
    #[error("relation '{0}' declares a hierarchy link to unknown relation '{1}'")]
    UnknownHierarchyPeer(String, String),

    /// Attempted to register a relation id twice.
    #[error("relation '{0}' is already registered")]
    DuplicateRelation(String),
}

pub type Result<T> = std::result::Result<T, RelationError>;
