//! Action-coordination error taxonomy (spec §4.6).

use plan_core::PlanObjectId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error("argument '{0}' is required but was not provided")]
    MissingArgument(String),

    #[error("context has no child bound to role '{0}'")]
    NoSuchChild(String),

    #[error("symbolic handle accessed before its context was bound")]
    Unbound,

    #[error("no transition named '{0}' from state '{1}'")]
    NoSuchTransition(String, String),

    #[error("script at {root_task} raised: {message}")]
    CodeError { root_task: PlanObjectId, message: String },

    #[error(transparent)]
    Plan(#[from] plan_core::PlanError),

    #[error(transparent)]
    Execution(#[from] plan_engine::ExecutionError),
}

pub type Result<T> = std::result::Result<T, ActionError>;
