//! Execution contexts: a root task and argument map bound to a
//! context model, resolving symbolic handles at runtime (spec §4.6,
//! "Execution context").

use crate::error::{ActionError, Result};
use plan_core::{Plan, PlanObjectId};
use std::collections::HashMap;

/// A symbolic reference that resolves against a bound context:
/// `event(name)` looks up a bound event on the root task, `child(role)`
/// looks up a role-bound subtask, `variable(name)` looks up an
/// argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Handle {
    Event(String),
    Child(String),
    Variable(String),
}

/// Until [`ExecutionContext::bind`] runs, attribute access returns
/// this instead of resolving (spec §4.6: "until bound, attribute
/// access returns a deferred reference").
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred(pub Handle);

pub struct ExecutionContext {
    root: Option<PlanObjectId>,
    arguments: HashMap<String, serde_json::Value>,
    children: HashMap<String, PlanObjectId>,
}

impl ExecutionContext {
    pub fn unbound(arguments: HashMap<String, serde_json::Value>) -> Self {
        ExecutionContext { root: None, arguments, children: HashMap::new() }
    }

    pub fn bind(&mut self, root: PlanObjectId) {
        self.root = Some(root);
    }

    pub fn is_bound(&self) -> bool {
        self.root.is_some()
    }

    pub fn bind_child(&mut self, role: impl Into<String>, task: PlanObjectId) {
        self.children.insert(role.into(), task);
    }

    /// Resolve a [`Handle`] against the bound root, or return the
    /// handle itself as a [`Deferred`] reference if not yet bound.
    pub fn resolve(&self, plan: &Plan, handle: Handle) -> std::result::Result<PlanObjectId, Deferred> {
        let Some(root) = self.root else {
            return Err(Deferred(handle));
        };
        match &handle {
            Handle::Event(name) => plan
                .task(root)
                .and_then(|t| t.event(name))
                .ok_or(Deferred(handle)),
            Handle::Child(role) => self.children.get(role).copied().ok_or(Deferred(handle)),
            Handle::Variable(_) => Err(Deferred(handle)),
        }
    }

    pub fn variable(&self, name: &str) -> Result<&serde_json::Value> {
        self.arguments.get(name).ok_or_else(|| ActionError::MissingArgument(name.to_string()))
    }

    pub fn child(&self, role: &str) -> Result<PlanObjectId> {
        self.children.get(role).copied().ok_or_else(|| ActionError::NoSuchChild(role.to_string()))
    }

    pub fn root(&self) -> Result<PlanObjectId> {
        self.root.ok_or(ActionError::Unbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::Task;

    #[test]
    fn unbound_context_defers_event_resolution() {
        let plan = Plan::new();
        let ctx = ExecutionContext::unbound(HashMap::new());
        let result = ctx.resolve(&plan, Handle::Event("success".into()));
        assert_eq!(result, Err(Deferred(Handle::Event("success".into()))));
    }

    #[test]
    fn bound_context_resolves_standard_event() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("demo"), &[]).unwrap();
        let mut ctx = ExecutionContext::unbound(HashMap::new());
        ctx.bind(root);
        let success = plan.task(root).unwrap().event("success").unwrap();
        assert_eq!(ctx.resolve(&plan, Handle::Event("success".into())), Ok(success));
    }

    #[test]
    fn child_resolves_by_role() {
        let mut plan = Plan::new();
        let root = plan.add_task(Task::new("demo"), &[]).unwrap();
        let worker = plan.add_task(Task::new("worker"), &[]).unwrap();
        let mut ctx = ExecutionContext::unbound(HashMap::new());
        ctx.bind(root);
        ctx.bind_child("worker", worker);
        assert_eq!(ctx.child("worker").unwrap(), worker);
        assert!(matches!(ctx.child("missing"), Err(ActionError::NoSuchChild(_))));
    }
}
