//! Tasks: long-lived activities with a lifecycle state machine (spec
//! §3, "Task").

use crate::ids::PlanObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `pending -> starting -> running -> {finishing -> finished |
/// failed_to_start}` (spec §3 and §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Starting,
    Running,
    Finishing,
    Finished,
    FailedToStart,
}

impl TaskState {
    /// Valid direct transitions, used to reject out-of-order state
    /// changes with a clear panic message in debug builds rather than
    /// silently corrupting the model.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Starting)
                | (Starting, Running)
                | (Starting, FailedToStart)
                | (Running, Finishing)
                | (Finishing, Finished)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::FailedToStart)
    }
}

/// The `(model, tags, arguments)` descriptor used by replacement
/// validation (spec §3: "a fullfilled-model descriptor ... used by
/// replacement validation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullfilledModel {
    pub model: String,
    pub tags: Vec<String>,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl FullfilledModel {
    pub fn new(model: impl Into<String>) -> Self {
        FullfilledModel {
            model: model.into(),
            tags: Vec::new(),
            arguments: HashMap::new(),
        }
    }

    /// Does `candidate` fulfill `self`? Spec §4.2: "a replacement fails
    /// with InvalidReplace if new does not fullfill the
    /// fullfilled_model of old — with messages distinguishing 'missing
    /// provided models' and 'argument mismatch'."
    pub fn check_fulfilled_by(&self, candidate: &FullfilledModel) -> Result<(), String> {
        let missing: Vec<&String> = self
            .tags
            .iter()
            .filter(|t| !candidate.tags.contains(t))
            .collect();
        if self.model != candidate.model && !candidate.tags.contains(&self.model) {
            return Err(format!(
                "missing provided models: replacement does not provide '{}'",
                self.model
            ));
        }
        if !missing.is_empty() {
            return Err(format!(
                "missing provided models: replacement does not provide {:?}",
                missing
            ));
        }
        for (key, value) in &self.arguments {
            if let Some(other) = candidate.arguments.get(key) {
                if other != value {
                    return Err(format!(
                        "argument mismatch on '{}': expected {:?}, got {:?}",
                        key, value, other
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Standard bound-event names every task has, per spec §3.
pub const EVENT_START: &str = "start";
pub const EVENT_STOP: &str = "stop";
pub const EVENT_SUCCESS: &str = "success";
pub const EVENT_FAILED: &str = "failed";

pub const STANDARD_EVENTS: &[&str] = &[EVENT_START, EVENT_STOP, EVENT_SUCCESS, EVENT_FAILED];

#[derive(Debug, Clone)]
pub struct Task {
    pub model: String,
    /// Settable until `start` emits.
    pub arguments: HashMap<String, serde_json::Value>,
    arguments_sealed: bool,
    /// Event name -> bound event generator id. Always contains at
    /// least [`STANDARD_EVENTS`] once the task is constructed.
    pub events: HashMap<String, PlanObjectId>,
    pub state: TaskState,
    pub fullfilled_model: FullfilledModel,
}

impl Task {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Task {
            fullfilled_model: FullfilledModel::new(model.clone()),
            model,
            arguments: HashMap::new(),
            arguments_sealed: false,
            events: HashMap::new(),
            state: TaskState::Pending,
        }
    }

    pub fn event(&self, name: &str) -> Option<PlanObjectId> {
        self.events.get(name).copied()
    }

    /// Set an argument. Spec §3: "argument mapping (key->value,
    /// settable until start)".
    pub fn set_argument(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), crate::error::PlanError> {
        if self.arguments_sealed {
            return Err(crate::error::PlanError::InvalidArgument(format!(
                "task arguments are sealed once started (tried to set '{}')",
                key.into()
            )));
        }
        self.arguments.insert(key.into(), value);
        Ok(())
    }

    pub fn seal_arguments(&mut self) {
        self.arguments_sealed = true;
    }

    pub fn transition(&mut self, next: TaskState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        if next == TaskState::Starting {
            self.seal_arguments();
        }
        true
    }
}
