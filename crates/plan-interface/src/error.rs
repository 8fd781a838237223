//! Interface-layer error taxonomy (spec §6).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("malformed packet: {0}")]
    Protocol(String),

    #[error("a call was received before the handshake completed")]
    HandshakeRequired,

    #[error("unknown command path: {0}")]
    UnknownPath(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Plan(#[from] plan_core::PlanError),

    #[error(transparent)]
    Execution(#[from] plan_engine::ExecutionError),
}

pub type Result<T> = std::result::Result<T, InterfaceError>;
