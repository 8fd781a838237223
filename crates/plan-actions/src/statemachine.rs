//! Finite state machines over tasks and events (spec §4.6, "State
//! machine contract").

use crate::context::ExecutionContext;
use crate::error::{ActionError, Result};
use plan_core::{Plan, PlanObjectId, Task};
use std::collections::HashMap;

/// A task to instantiate while a state is active, with the role it
/// plays in the execution context.
#[derive(Debug, Clone)]
pub struct StateTask {
    pub role: String,
    pub model: String,
}

/// `(source_state, source_event) -> target_state` (spec §4.6,
/// "Transitions").
#[derive(Debug, Clone)]
pub struct Transition {
    pub source_state: String,
    pub source_event: String,
    pub target_state: String,
}

/// `(task_role, task_event) -> root_event` forwarded on entry (spec
/// §4.6: "apply declared forwards").
#[derive(Debug, Clone)]
pub struct Forward {
    pub task_role: String,
    pub task_event: String,
    pub root_event: String,
}

#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub tasks: Vec<StateTask>,
    pub forwards: Vec<Forward>,
}

pub struct StateMachineModel {
    pub states: HashMap<String, State>,
    pub transitions: Vec<Transition>,
}

impl StateMachineModel {
    pub fn new(states: Vec<State>, transitions: Vec<Transition>) -> Self {
        StateMachineModel {
            states: states.into_iter().map(|s| (s.name.clone(), s)).collect(),
            transitions,
        }
    }

    fn transition_from(&self, state: &str, event: &str) -> Result<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.source_state == state && t.source_event == event)
            .ok_or_else(|| ActionError::NoSuchTransition(event.to_string(), state.to_string()))
    }
}

/// Exactly one state is active at a time (spec §4.6).
pub struct StateMachineRunner<'m> {
    model: &'m StateMachineModel,
    root: PlanObjectId,
    current: String,
    active_tasks: Vec<PlanObjectId>,
}

impl<'m> StateMachineRunner<'m> {
    /// Enter `initial_state` immediately.
    pub fn start(model: &'m StateMachineModel, plan: &mut Plan, ctx: &mut ExecutionContext, initial_state: &str) -> Result<Self> {
        let root = ctx.root()?;
        let mut runner = StateMachineRunner { model, root, current: String::new(), active_tasks: Vec::new() };
        runner.enter(plan, ctx, initial_state)?;
        Ok(runner)
    }

    pub fn current_state(&self) -> &str {
        &self.current
    }

    fn enter(&mut self, plan: &mut Plan, ctx: &mut ExecutionContext, name: &str) -> Result<()> {
        let state = self
            .model
            .states
            .get(name)
            .ok_or_else(|| ActionError::NoSuchTransition(String::new(), name.to_string()))?;
        let root = ctx.root()?;

        let success_events: Vec<String> = self
            .model
            .transitions
            .iter()
            .filter(|t| t.source_state == name)
            .map(|t| t.source_event.clone())
            .collect();

        let mut entered = Vec::new();
        for task_spec in &state.tasks {
            let task_id = plan.add_task(Task::new(task_spec.model.clone()), &[])?;
            let required = if success_events.is_empty() {
                vec![plan_core::EVENT_SUCCESS.to_string()]
            } else {
                success_events.clone()
            };
            plan.add_task_edge(
                &plan_core::relations::depends_on(),
                root,
                task_id,
                Some(serde_json::to_value(&required).expect("serializable")),
            )?;
            ctx.bind_child(task_spec.role.clone(), task_id);
            entered.push(task_id);
        }

        for fwd in &state.forwards {
            let Some(task_id) = ctx.child(&fwd.task_role).ok() else { continue };
            let Some(src) = plan.task(task_id).and_then(|t| t.event(&fwd.task_event)) else { continue };
            let Some(dst) = plan.task(root).and_then(|t| t.event(&fwd.root_event)) else { continue };
            plan_engine::forward_to(plan, src, dst)?;
        }

        self.active_tasks = entered;
        self.current = name.to_string();
        Ok(())
    }

    /// Remove this state's tasks as dependencies of the root; once
    /// unreachable, the next cycle's garbage collection reclaims them
    /// (spec §4.6: "remove their dependencies; rely on garbage
    /// collection").
    fn teardown_current(&mut self, plan: &mut Plan) -> Result<()> {
        for task in std::mem::take(&mut self.active_tasks) {
            plan.remove_task_edge(&plan_core::relations::depends_on(), self.root, task)?;
        }
        Ok(())
    }

    /// Handle a firing of `event` from the current state, tearing down
    /// its tasks and entering the declared target (spec §4.6: "tear
    /// down the current state's tasks ... then enter the target
    /// state").
    pub fn handle_event(&mut self, plan: &mut Plan, ctx: &mut ExecutionContext, event: &str) -> Result<()> {
        let target = self.model.transition_from(&self.current, event)?.target_state.clone();
        tracing::debug!(from = %self.current, %event, to = %target, "state machine transition");
        self.teardown_current(plan)?;
        self.enter(plan, ctx, &target)
    }
}
