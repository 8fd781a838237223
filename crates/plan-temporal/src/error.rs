//! Errors raised while tracking temporal and occurrence constraints
//! (spec §4.5, §7).
//!
//! Unlike [`plan_core::PlanError`], these are not raised synchronously
//! to the caller that triggered them — they surface later, during
//! `check_structural_constraints` in `plan-engine`'s cycle, hence the
//! `generator`/`source`/`deadline` shape rather than a simple message.

use plan_core::PlanObjectId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemporalError {
    #[error("{0}")]
    InvalidConstraint(String),

    #[error("{generator} missed its deadline: expected after {from} by {deadline}")]
    MissedDeadlineError {
        generator: PlanObjectId,
        from: PlanObjectId,
        deadline: u64,
    },

    #[error("temporal constraint violated between {from} and {target}: diff {diff} is not in the allowed set")]
    TemporalConstraintViolation {
        from: PlanObjectId,
        target: PlanObjectId,
        diff: i64,
    },

    #[error("occurrence constraint violated for {generator}: {count} occurrences, expected {min}..={max}")]
    OccurrenceConstraintViolation {
        generator: PlanObjectId,
        count: u32,
        min: u32,
        max: u32,
    },

    #[error(transparent)]
    Plan(#[from] plan_core::PlanError),

    #[error(transparent)]
    Relation(#[from] plan_relations::RelationError),
}

pub type Result<T> = std::result::Result<T, TemporalError>;
