//! Scripts: sequences of instructions executed in order, each able to
//! suspend until a trigger re-runs the script (spec §4.6, "Script
//! contract").

use crate::context::ExecutionContext;
use crate::error::{ActionError, Result};
use plan_core::{Plan, PlanObjectId};
use plan_engine::Cycle;

/// One step of a script. `execute` returns whether the script should
/// immediately advance to the next instruction (`true`) or suspend
/// until re-triggered by an event or timeout (`false`). Instructions
/// that call or emit do so by queuing on the `cycle` they are stepped
/// with, the same queue the engine's propagation fixpoint drains.
pub trait Instruction: Send {
    fn execute(
        &mut self,
        script: &mut Script,
        plan: &mut Plan,
        ctx: &ExecutionContext,
        cycle: &mut Cycle,
    ) -> Result<bool>;
}

/// A `timeout_start`/`timeout_stop` pair; cancellation disables the
/// started timer rather than unregistering it (spec §5,
/// "Cancellation/timeout": "Scripts cancel a timer by marking its
/// paired instruction disabled").
pub struct TimeoutStart {
    pub delay_ms: u64,
    pub disabled: bool,
}

impl Instruction for TimeoutStart {
    fn execute(&mut self, script: &mut Script, _plan: &mut Plan, _ctx: &ExecutionContext, _cycle: &mut Cycle) -> Result<bool> {
        if !self.disabled {
            script.pending_timeout = Some(self.delay_ms);
        }
        Ok(true)
    }
}

pub struct TimeoutStop;

impl Instruction for TimeoutStop {
    fn execute(&mut self, script: &mut Script, _plan: &mut Plan, _ctx: &ExecutionContext, _cycle: &mut Cycle) -> Result<bool> {
        script.pending_timeout = None;
        Ok(true)
    }
}

/// Suspend until `event` has emitted in the bound root's history.
pub struct WaitEvent {
    pub event_getter: Box<dyn Fn(&Plan, &ExecutionContext) -> Result<PlanObjectId> + Send>,
}

impl Instruction for WaitEvent {
    fn execute(&mut self, _script: &mut Script, plan: &mut Plan, ctx: &ExecutionContext, _cycle: &mut Cycle) -> Result<bool> {
        let event = (self.event_getter)(plan, ctx)?;
        Ok(plan.event(event).map(|g| g.emitted()).unwrap_or(false))
    }
}

/// Call a generator (typically the root's `start`), suspending until
/// the engine processes the call in the next cycle's propagation.
pub struct Emit {
    pub event_getter: Box<dyn Fn(&Plan, &ExecutionContext) -> Result<PlanObjectId> + Send>,
    pub queued: bool,
}

impl Instruction for Emit {
    fn execute(&mut self, _script: &mut Script, plan: &mut Plan, ctx: &ExecutionContext, cycle: &mut Cycle) -> Result<bool> {
        if self.queued {
            return Ok(true);
        }
        let event = (self.event_getter)(plan, ctx)?;
        cycle.queue_call(event, serde_json::Value::Null);
        self.queued = true;
        Ok(false)
    }
}

/// Branch to one of two instruction indices depending on a predicate.
pub struct Branch {
    pub predicate: Box<dyn Fn(&Plan, &ExecutionContext) -> bool + Send>,
    pub if_true: usize,
    pub if_false: usize,
}

impl Instruction for Branch {
    fn execute(&mut self, script: &mut Script, plan: &mut Plan, ctx: &ExecutionContext, _cycle: &mut Cycle) -> Result<bool> {
        script.cursor = if (self.predicate)(plan, ctx) { self.if_true } else { self.if_false };
        Ok(true)
    }
}

/// A sequence of instructions plus the suspend/resume cursor (spec
/// §4.6: "executed in order ... suspends until a trigger ... re-runs
/// `step()`").
pub struct Script {
    instructions: Vec<Box<dyn Instruction>>,
    cursor: usize,
    pending_timeout: Option<u64>,
    root_task: PlanObjectId,
}

impl Script {
    pub fn new(instructions: Vec<Box<dyn Instruction>>, root_task: PlanObjectId) -> Self {
        Script { instructions, cursor: 0, pending_timeout: None, root_task }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.instructions.len()
    }

    pub fn pending_timeout(&self) -> Option<u64> {
        self.pending_timeout
    }

    /// Run instructions until one suspends (returns `false`) or the
    /// script ends. Uncaught errors are wrapped as `CodeError` (spec
    /// §4.6: "Uncaught exceptions are wrapped as CodeError(root_task)").
    pub fn step(&mut self, plan: &mut Plan, ctx: &ExecutionContext, cycle: &mut Cycle) -> Result<()> {
        while self.cursor < self.instructions.len() {
            let root_task = self.root_task;
            // Take ownership of the instruction for the call so `self`
            // can be passed back in for cursor/timeout bookkeeping.
            let mut instruction = std::mem::replace(&mut self.instructions[self.cursor], Box::new(NoOp));
            let outcome = instruction.execute(self, plan, ctx, cycle);
            self.instructions[self.cursor] = instruction;
            match outcome {
                Ok(true) => self.cursor += 1,
                Ok(false) => return Ok(()),
                Err(err @ ActionError::CodeError { .. }) => {
                    tracing::warn!(?root_task, error = %err, "script raised an uncaught error");
                    return Err(err);
                }
                Err(other) => {
                    tracing::warn!(?root_task, error = %other, "script instruction failed, wrapping as code error");
                    return Err(ActionError::CodeError { root_task, message: other.to_string() });
                }
            }
        }
        Ok(())
    }
}

struct NoOp;

impl Instruction for NoOp {
    fn execute(&mut self, _script: &mut Script, _plan: &mut Plan, _ctx: &ExecutionContext, _cycle: &mut Cycle) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{Plan, Task};
    use std::collections::HashMap;

    #[test]
    fn script_runs_until_wait_suspends() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("demo"), &[]).unwrap();
        let mut ctx = ExecutionContext::unbound(HashMap::new());
        ctx.bind(root);

        let wait = WaitEvent {
            event_getter: Box::new(|plan, ctx| {
                let root = ctx.root()?;
                plan.task(root)
                    .and_then(|t| t.event(plan_core::EVENT_SUCCESS))
                    .ok_or(ActionError::Unbound)
            }),
        };
        let mut script = Script::new(vec![Box::new(wait)], root);
        let mut cycle = Cycle::new(0);
        script.step(&mut plan, &ctx, &mut cycle).unwrap();
        assert!(!script.is_finished());

        let success = plan.task(root).unwrap().event(plan_core::EVENT_SUCCESS).unwrap();
        if let Some(plan_core::PlanObjectKind::Event(g)) = plan.object_mut(success) {
            g.state = plan_core::GeneratorState::Added;
            g.record_emission(plan_core::Emission { cycle: 0, time: 0, context: serde_json::Value::Null });
        }
        script.step(&mut plan, &ctx, &mut cycle).unwrap();
        assert!(script.is_finished());
    }

    #[test]
    fn disabled_timeout_does_not_arm() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("demo"), &[]).unwrap();
        let ctx = ExecutionContext::unbound(HashMap::new());
        let mut script = Script::new(
            vec![Box::new(TimeoutStart { delay_ms: 1000, disabled: true })],
            root,
        );
        let mut cycle = Cycle::new(0);
        script.step(&mut plan, &ctx, &mut cycle).unwrap();
        assert_eq!(script.pending_timeout(), None);
    }
}
