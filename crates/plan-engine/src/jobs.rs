//! Job / placeholder-task semantics (spec §4.4, "Jobs").
//!
//! A job is a task fulfilling the job capability set: at least a
//! `job_id` and `job_name` stashed in its argument map. The
//! placeholder is the user-visible plan element; its linked
//! `planning_task` elaborates it asynchronously and, on success,
//! commits a transaction that replaces the placeholder while
//! preserving the job id.

use crate::error::{ExecutionError, Result};
use plan_core::{Plan, PlanObjectId, Transaction, TxOp};
use std::collections::HashMap;

pub const ARG_JOB_ID: &str = "job_id";
pub const ARG_JOB_NAME: &str = "job_name";

#[derive(Debug, Clone, PartialEq)]
pub enum JobNotification {
    Monitored { job_id: String, placeholder: PlanObjectId },
    PlanningReady { job_id: String },
    Planning { job_id: String },
    Ready { job_id: String },
    PlanningFailed { job_id: String, reason: String },
    Started { job_id: String },
    Success { job_id: String },
    Failed { job_id: String },
    Finalized { job_id: String },
    Replaced { job_id: String, replacement: PlanObjectId },
    Dropped { job_id: String },
    Lost { job_id: String, new_job_id: String },
}

/// Tracks live placeholders and queues notifications for the
/// `cycle_end` flush (spec §4.4, "Notifications from a cycle are
/// queued and flushed on cycle_end").
#[derive(Default)]
pub struct JobTable {
    next_id: u64,
    placeholders: HashMap<PlanObjectId, String>,
    queue: Vec<JobNotification>,
}

fn job_id_of(plan: &Plan, task: PlanObjectId) -> Option<String> {
    plan.task(task)
        .and_then(|t| t.arguments.get(ARG_JOB_ID))
        .and_then(|v| v.as_str())
        .map(String::from)
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_job_id(&mut self) -> String {
        self.next_id += 1;
        format!("job-{}", self.next_id)
    }

    /// Begin tracking `placeholder`, stamping a fresh `job_id`/`job_name`
    /// onto it and linking it to `planning_task` (spec §4.4,
    /// "MONITORED"). Returns the assigned job id.
    pub fn start_job(
        &mut self,
        plan: &mut Plan,
        placeholder: PlanObjectId,
        planning_task: PlanObjectId,
        job_name: impl Into<String>,
    ) -> Result<String> {
        if !plan.has(placeholder) || !plan.has(planning_task) {
            return Err(ExecutionError::Plan(plan_core::PlanError::NotAMember(placeholder)));
        }
        let job_id = self.fresh_job_id();
        if let Some(t) = plan.task_mut(placeholder) {
            t.arguments
                .insert(ARG_JOB_ID.to_string(), serde_json::Value::String(job_id.clone()));
            t.arguments
                .insert(ARG_JOB_NAME.to_string(), serde_json::Value::String(job_name.into()));
        }
        plan.add_task_edge(&plan_core::relations::planning_task(), placeholder, planning_task, None)?;
        self.placeholders.insert(placeholder, job_id.clone());
        tracing::info!(job_id = %job_id, ?placeholder, ?planning_task, "job started");
        self.queue.push(JobNotification::Monitored { job_id: job_id.clone(), placeholder });
        self.queue.push(JobNotification::PlanningReady { job_id: job_id.clone() });
        self.queue.push(JobNotification::Planning { job_id: job_id.clone() });
        Ok(job_id)
    }

    /// `drop_job`: soft stop, unmark mission only (spec §6).
    pub fn drop_job(&mut self, plan: &mut Plan, placeholder: PlanObjectId) -> Result<()> {
        plan.unmark_mission(placeholder)?;
        if let Some(job_id) = self.placeholders.get(&placeholder).cloned() {
            self.queue.push(JobNotification::Dropped { job_id });
        }
        Ok(())
    }

    /// `kill_job`: unmark mission and forcibly stop the placeholder by
    /// calling its `stop` event (spec §6). Queuing the actual call is
    /// left to the caller's [`crate::propagation::Cycle`].
    pub fn kill_job(&mut self, plan: &mut Plan, placeholder: PlanObjectId) -> Result<PlanObjectId> {
        plan.unmark_mission(placeholder)?;
        let stop = plan
            .task(placeholder)
            .and_then(|t| t.event(plan_core::EVENT_STOP))
            .ok_or(plan_core::PlanError::NotAMember(placeholder))?;
        if let Some(job_id) = self.placeholders.get(&placeholder).cloned() {
            self.queue.push(JobNotification::Dropped { job_id });
        }
        Ok(stop)
    }

    /// Commit a transaction that replaces `placeholder` with the
    /// elaborated subplan's root, preserving the job id (spec §4.4:
    /// "replacing the placeholder with the elaborated subplan and
    /// preserving the job_id").
    pub fn commit_planning_success(
        &mut self,
        base: &mut Plan,
        tx: Transaction,
        placeholder: PlanObjectId,
        replacement: PlanObjectId,
    ) -> Result<()> {
        let job_id = job_id_of(base, placeholder).or_else(|| self.placeholders.get(&placeholder).cloned());
        let (ops, _deltas) = tx.commit(base)?;
        let replaced = ops
            .iter()
            .any(|op| matches!(op, TxOp::Replaced { old, new } if *old == placeholder && *new == replacement));
        if let Some(job_id) = job_id {
            if replaced {
                self.queue.push(JobNotification::Ready { job_id: job_id.clone() });
                self.queue.push(JobNotification::Replaced { job_id: job_id.clone(), replacement });
                let replacement_job_id = job_id_of(base, replacement);
                if replacement_job_id.as_deref().is_some_and(|id| id != job_id) {
                    self.queue.push(JobNotification::Lost {
                        job_id,
                        new_job_id: replacement_job_id.unwrap(),
                    });
                } else {
                    self.placeholders.remove(&placeholder);
                    self.placeholders.insert(replacement, job_id);
                }
            } else {
                self.queue.push(JobNotification::Ready { job_id });
            }
        }
        Ok(())
    }

    /// Fail planning: the placeholder is left to the fault-response
    /// path with a [`ExecutionError::PlanningFailedError`] (spec §4.4:
    /// "the placeholder is failed with PlanningFailedError").
    pub fn fail_planning(&mut self, placeholder: PlanObjectId, reason: impl Into<String>) -> ExecutionError {
        let reason = reason.into();
        tracing::warn!(?placeholder, %reason, "planning failed");
        if let Some(job_id) = self.placeholders.get(&placeholder).cloned() {
            self.queue.push(JobNotification::PlanningFailed { job_id, reason: reason.clone() });
        }
        ExecutionError::PlanningFailedError { placeholder, reason }
    }

    /// Record a started/success/failed/finalized transition for a
    /// tracked job, driven from [`crate::lifecycle::sync_task_states`].
    pub fn on_task_state(&mut self, plan: &Plan, task: PlanObjectId, state: plan_core::TaskState) {
        let Some(job_id) = self.placeholders.get(&task).cloned() else { return };
        use plan_core::TaskState::*;
        match state {
            Running => self.queue.push(JobNotification::Started { job_id }),
            Finishing => {
                let succeeded = plan
                    .task(task)
                    .and_then(|t| t.event(plan_core::EVENT_SUCCESS))
                    .and_then(|id| plan.event(id))
                    .map(|g| g.emitted())
                    .unwrap_or(false);
                self.queue.push(if succeeded {
                    JobNotification::Success { job_id }
                } else {
                    JobNotification::Failed { job_id }
                });
            }
            Finished | FailedToStart => self.queue.push(JobNotification::Finalized { job_id }),
            _ => {}
        }
    }

    /// Flush every queued notification, in order (spec §4.7, step 7).
    pub fn drain(&mut self) -> Vec<JobNotification> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::Task;

    #[test]
    fn start_job_stamps_id_and_queues_monitored() {
        let mut plan = Plan::new();
        let placeholder = plan.add_task(Task::new("fetch"), &[]).unwrap();
        let planning = plan.add_task(Task::new("plan_fetch"), &[]).unwrap();
        let mut jobs = JobTable::new();
        let job_id = jobs.start_job(&mut plan, placeholder, planning, "fetch data").unwrap();
        assert_eq!(job_id_of(&plan, placeholder).as_deref(), Some(job_id.as_str()));
        let notifications = jobs.drain();
        assert_eq!(
            notifications,
            vec![
                JobNotification::Monitored { job_id: job_id.clone(), placeholder },
                JobNotification::PlanningReady { job_id: job_id.clone() },
                JobNotification::Planning { job_id },
            ]
        );
    }

    #[test]
    fn fail_planning_queues_planning_failed() {
        let mut plan = Plan::new();
        let placeholder = plan.add_task(Task::new("fetch"), &[]).unwrap();
        let planning = plan.add_task(Task::new("plan_fetch"), &[]).unwrap();
        let mut jobs = JobTable::new();
        let job_id = jobs.start_job(&mut plan, placeholder, planning, "fetch data").unwrap();
        jobs.drain();
        let err = jobs.fail_planning(placeholder, "no route found");
        assert!(matches!(err, ExecutionError::PlanningFailedError { .. }));
        assert_eq!(
            jobs.drain(),
            vec![JobNotification::PlanningFailed { job_id, reason: "no route found".to_string() }]
        );
    }
}
