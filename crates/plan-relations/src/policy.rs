//! Per-relation policy flags and the replacement edge-move table.
//!
//! See spec §4.1 ("Relation graph") and §4.2 ("Replacement policy
//! table"). The flags here are fixed for the lifetime of a relation
//! class; they are never toggled per-edge.

use serde::{Deserialize, Serialize};

/// Fixed policy flags for one relation class.
///
/// Mirrors the bullet list under "Relation graph" in spec §3:
/// `strong`, `weak` is simply `!strong`, `dag`, `copy_on_replace`,
/// `embeds_info`. `hierarchy` membership is tracked separately by the
/// registry since it is a relationship *between* relation classes,
/// not a flag on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationPolicy {
    /// Edges are never rewritten by replacements.
    pub strong: bool,
    /// Replacements may move edges even when the moved end is the
    /// parent (source) side of the edge. Irrelevant when `strong`.
    pub weak: bool,
    /// Inserting an edge that would create a cycle fails instead of
    /// succeeding.
    pub dag: bool,
    /// Replacement copies the edge onto the new object instead of
    /// moving it off the old one.
    pub copy_on_replace: bool,
    /// Edges carry an `info` payload; re-inserting an edge with a
    /// different payload is an error unless a merge function is
    /// supplied.
    pub embeds_info: bool,
}

impl RelationPolicy {
    /// The common case: a plain non-DAG, strong, info-free relation
    /// (e.g. membership-style edges that should never move).
    pub const fn strong() -> Self {
        RelationPolicy {
            strong: true,
            weak: false,
            dag: false,
            copy_on_replace: false,
            embeds_info: false,
        }
    }

    /// A plain weak, non-DAG, info-free relation — the default for
    /// most dependency-style edges.
    pub const fn weak() -> Self {
        RelationPolicy {
            strong: false,
            weak: true,
            dag: false,
            copy_on_replace: false,
            embeds_info: false,
        }
    }

    /// A weak DAG relation (e.g. `depends_on`).
    pub const fn weak_dag() -> Self {
        RelationPolicy {
            dag: true,
            ..Self::weak()
        }
    }
}

/// What happens to an edge incident on the *old* side of a
/// replacement, per the table in spec §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    /// Leave the edge exactly where it is; do not touch `new` at all.
    Skip,
    /// Remove the edge from `old` and add the equivalent edge
    /// touching `new` instead.
    Move,
    /// Add the equivalent edge touching `new` in addition to leaving
    /// the original edge on `old`.
    Copy,
}

/// Decide the fate of one edge incident on `old` during a replacement.
///
/// `old_is_parent` is true when `old` is the source (parent) end of
/// the edge under consideration; false when it is the target (child)
/// end. The "edge at new side" row of the table is always `keep`,
/// i.e. pre-existing edges of `new` are left untouched — that case
/// does not go through this function at all.
///
/// Resolution of the open question noted in spec §9 ("the source also
/// bypasses strong edges in one branch and not another"): `strong`
/// always wins first (edges in a strong graph are never moved or
/// copied), then `copy_on_replace` (copies both parent- and
/// child-side edges), then the parent/child split: an edge where
/// `old` is the parent stays on `old` untouched, since a replacement
/// must never silently re-parent `old`'s existing children onto
/// `new`; only child-side edges (where `old` is the target) move.
/// `weak` distinguishes a relation from `strong` but does not change
/// which side moves — see DESIGN.md for the worked scenarios.
pub fn replacement_action(policy: &RelationPolicy, old_is_parent: bool) -> EdgeAction {
    if policy.strong {
        return EdgeAction::Skip;
    }
    if policy.copy_on_replace {
        return EdgeAction::Copy;
    }
    if old_is_parent {
        return EdgeAction::Skip;
    }
    EdgeAction::Move
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_always_skips() {
        let p = RelationPolicy {
            strong: true,
            weak: false,
            dag: false,
            copy_on_replace: true,
            embeds_info: false,
        };
        assert_eq!(replacement_action(&p, true), EdgeAction::Skip);
        assert_eq!(replacement_action(&p, false), EdgeAction::Skip);
    }

    #[test]
    fn copy_on_replace_copies_both_sides() {
        let p = RelationPolicy {
            copy_on_replace: true,
            ..RelationPolicy::weak()
        };
        assert_eq!(replacement_action(&p, true), EdgeAction::Copy);
        assert_eq!(replacement_action(&p, false), EdgeAction::Copy);
    }

    #[test]
    fn parent_side_edges_always_stay_on_old() {
        let non_weak = RelationPolicy {
            weak: false,
            ..RelationPolicy::weak_dag()
        };
        assert_eq!(replacement_action(&non_weak, true), EdgeAction::Skip);
        assert_eq!(replacement_action(&non_weak, false), EdgeAction::Move);

        let weak = RelationPolicy::weak_dag();
        assert_eq!(replacement_action(&weak, true), EdgeAction::Skip);
        assert_eq!(replacement_action(&weak, false), EdgeAction::Move);
    }
}
