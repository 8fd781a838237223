//! Validation error taxonomy for plan mutations (spec §7, "Validation").
//!
//! These are always raised synchronously to the caller; they never
//! enter the fault-response/exception-propagation path used by
//! execution errors (that taxonomy lives in `plan-engine`).

use crate::ids::PlanObjectId;
use plan_relations::RelationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    /// `add` was called with something that is neither a task nor an
    /// event, or with arguments that don't type-check against a
    /// model's argument descriptors.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The object was already finalized in some plan and cannot be
    /// re-added (spec §3: "A finalized object cannot be re-added").
    #[error("plan object {0} was already finalized and cannot be re-added")]
    Finalized(PlanObjectId),

    /// `replace`/`replace_task` failed because `new` does not
    /// fulfill `old`'s `fullfilled_model`.
    #[error("{old} cannot be replaced by {new}: {reason}")]
    InvalidReplace {
        old: PlanObjectId,
        new: PlanObjectId,
        reason: String,
    },

    /// Referenced a plan object id that isn't a member of this plan.
    #[error("plan object {0} is not a member of this plan")]
    NotAMember(PlanObjectId),

    /// Referenced a plan object id that doesn't exist at all (stale
    /// or foreign arena index).
    #[error("plan object {0} does not exist")]
    NoSuchObject(PlanObjectId),

    /// A task has no bound event of the requested name (spec §9,
    /// "Dynamic dispatch / method_missing" — replaced by explicit
    /// lookup that fails with a named error instead of silently
    /// returning `nil`/raising `NoMethodError`).
    #[error("task {0} has no event named '{1}'")]
    NoSuchEvent(PlanObjectId, String),

    /// A context has no bound child of the requested role.
    #[error("no child bound to role '{0}'")]
    NoSuchChild(String),

    /// A transaction failed to commit because the base plan advanced
    /// past the revision the transaction was forked from.
    #[error("transaction preconditions violated: base plan was mutated since the transaction began")]
    ConcurrentModification,

    /// The relation substrate rejected a mutation (cycle, info
    /// conflict, unknown relation) while applying a plan-level
    /// operation.
    #[error(transparent)]
    Relation(#[from] RelationError),
}

pub type Result<T> = std::result::Result<T, PlanError>;
