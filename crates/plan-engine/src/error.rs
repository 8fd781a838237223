//! Unified execution-error taxonomy (spec §7, "Execution" kind).
//!
//! Unlike [`plan_core::PlanError`], these never return synchronously
//! to the call that triggered them — they are localized to an origin
//! plan object and pushed through [`crate::fault`]'s propagation path,
//! ending either at a fault handler or as a fatal, reported exception.

use plan_core::PlanObjectId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    /// An exception raised in a user handler, wrapped with the
    /// generator that raised it (spec §4.3).
    #[error("handler for {origin} raised: {message}")]
    LocalizedError { origin: PlanObjectId, message: String },

    /// A `depends_on` child emitted `stop` without any of its
    /// required events (spec §4.4).
    #[error("child {origin} failed, affecting {affected}")]
    ChildFailedError {
        origin: PlanObjectId,
        affected: PlanObjectId,
    },

    /// A job's planning task failed before it could commit its
    /// transaction (spec §4.4).
    #[error("planning failed for job {placeholder}: {reason}")]
    PlanningFailedError {
        placeholder: PlanObjectId,
        reason: String,
    },

    /// A script instruction raised an uncaught exception (spec §4.6).
    #[error("script at {root_task} raised: {message}")]
    CodeError { root_task: PlanObjectId, message: String },

    /// `call` was issued against a non-controllable generator (spec
    /// §4.3).
    #[error("generator {0} is not controllable")]
    NotControllable(PlanObjectId),

    #[error(transparent)]
    Temporal(#[from] plan_temporal::TemporalError),

    #[error(transparent)]
    Plan(#[from] plan_core::PlanError),

    #[error(transparent)]
    Relation(#[from] plan_relations::RelationError),
}

impl ExecutionError {
    /// The plan object this error is localized to, for propagation
    /// along dependency/error-handling edges toward roots.
    pub fn origin(&self) -> Option<PlanObjectId> {
        match self {
            ExecutionError::LocalizedError { origin, .. } => Some(*origin),
            ExecutionError::ChildFailedError { affected, .. } => Some(*affected),
            ExecutionError::PlanningFailedError { placeholder, .. } => Some(*placeholder),
            ExecutionError::CodeError { root_task, .. } => Some(*root_task),
            ExecutionError::NotControllable(g) => Some(*g),
            ExecutionError::Temporal(plan_temporal::TemporalError::MissedDeadlineError { generator, .. }) => {
                Some(*generator)
            }
            ExecutionError::Temporal(plan_temporal::TemporalError::TemporalConstraintViolation { target, .. }) => {
                Some(*target)
            }
            ExecutionError::Temporal(plan_temporal::TemporalError::OccurrenceConstraintViolation {
                generator,
                ..
            }) => Some(*generator),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
