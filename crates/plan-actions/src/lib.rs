//! Action models, execution contexts, state machines, and scripts
//! (spec §4.6, "Action Coordination").

pub mod context;
pub mod error;
pub mod model;
pub mod script;
pub mod statemachine;

pub use context::{Deferred, ExecutionContext, Handle};
pub use error::{ActionError, Result};
pub use model::{ActionLibrary, ActionModel, ArgumentDescriptor, ArgumentType};
pub use script::{Branch, Emit, Instruction, Script, TimeoutStart, TimeoutStop, WaitEvent};
pub use statemachine::{Forward, State, StateMachineModel, StateMachineRunner, StateTask, Transition};
