//! Submit job → interface receives `MONITORED, PLANNING_READY,
//! PLANNING, READY, STARTED, SUCCESS, FINALIZED` in that order,
//! each exactly once.

use plan_core::{Plan, PlanObjectKind, Task, Transaction};
use plan_engine::{JobNotification, JobTable};

#[test]
fn scenario_5_job_lifecycle_notifications() {
    let mut plan = Plan::new();
    let placeholder = plan.add_task(Task::new("fetch"), &[]).unwrap();
    let planning = plan.add_task(Task::new("plan_fetch"), &[]).unwrap();
    let mut jobs = JobTable::new();

    let job_id = jobs.start_job(&mut plan, placeholder, planning, "fetch data").unwrap();

    // Planning succeeds with a no-op transaction: the placeholder
    // itself is kept, so this is a plain READY, not a REPLACED.
    let tx = Transaction::begin(&plan);
    jobs.commit_planning_success(&mut plan, tx, placeholder, placeholder).unwrap();

    jobs.on_task_state(&plan, placeholder, plan_core::TaskState::Running);

    let success = plan.task(placeholder).unwrap().event(plan_core::EVENT_SUCCESS).unwrap();
    if let Some(PlanObjectKind::Event(g)) = plan.object_mut(success) {
        g.record_emission(plan_core::Emission { cycle: 0, time: 0, context: serde_json::Value::Null });
    }
    jobs.on_task_state(&plan, placeholder, plan_core::TaskState::Finishing);
    jobs.on_task_state(&plan, placeholder, plan_core::TaskState::Finished);

    assert_eq!(
        jobs.drain(),
        vec![
            JobNotification::Monitored { job_id: job_id.clone(), placeholder },
            JobNotification::PlanningReady { job_id: job_id.clone() },
            JobNotification::Planning { job_id: job_id.clone() },
            JobNotification::Ready { job_id: job_id.clone() },
            JobNotification::Started { job_id: job_id.clone() },
            JobNotification::Success { job_id: job_id.clone() },
            JobNotification::Finalized { job_id },
        ]
    );
}
