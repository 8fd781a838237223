//! Job-control surface exposed to remote clients (spec §6, "Job
//! control").

use crate::error::Result;
use plan_core::{Plan, PlanObjectId, Task};
use plan_engine::JobTable;

/// `start_job(action, args)`: instantiate the action's placeholder and
/// planning tasks and begin tracking them, returning the assigned
/// `job_id` (spec §6).
pub fn start_job(
    plan: &mut Plan,
    jobs: &mut JobTable,
    action_model: impl Into<String>,
    job_name: impl Into<String>,
    args: serde_json::Value,
) -> Result<String> {
    let action_model = action_model.into();
    let mut placeholder = Task::new(action_model.clone());
    if let serde_json::Value::Object(map) = args {
        for (k, v) in map {
            placeholder.set_argument(k, v)?;
        }
    }
    let placeholder_id = plan.add_task(placeholder, &[])?;
    let planning_id = plan.add_task(Task::new(format!("plan[{action_model}]")), &[])?;
    plan.mark_mission(placeholder_id)?;
    Ok(jobs.start_job(plan, placeholder_id, planning_id, job_name)?)
}

/// `drop_job(id)`: unmark as mission, a soft stop (spec §6).
pub fn drop_job(plan: &mut Plan, jobs: &mut JobTable, placeholder: PlanObjectId) -> Result<()> {
    Ok(jobs.drop_job(plan, placeholder)?)
}

/// `kill_job(id)`: unmark as mission and forcibly stop the task.
/// Returns the `stop` event to queue into the next cycle (spec §6).
pub fn kill_job(plan: &mut Plan, jobs: &mut JobTable, placeholder: PlanObjectId) -> Result<PlanObjectId> {
    Ok(jobs.kill_job(plan, placeholder)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_job_marks_mission_and_assigns_id() {
        let mut plan = Plan::new();
        let mut jobs = JobTable::new();
        let job_id = start_job(
            &mut plan,
            &mut jobs,
            "fetch_page",
            "fetch the homepage",
            serde_json::json!({ "url": "https://example.com" }),
        )
        .unwrap();
        assert!(job_id.starts_with("job-"));
        assert_eq!(plan.tasks().count(), 2);
    }
}
