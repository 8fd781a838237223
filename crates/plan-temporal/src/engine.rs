//! Deadline scheduling and constraint checking driven by event
//! emissions (spec §4.5).
//!
//! This module has no cycle loop of its own — `plan-engine` calls
//! [`on_emission`] once per emitted event during its propagation step
//! and [`drain_missed`] once per cycle, then folds the returned
//! [`TemporalError`]s into its fault-response handling.

use crate::error::{Result, TemporalError};
use crate::intervals::TemporalConstraintSet;
use plan_core::{DeadlineEntry, Plan, PlanObjectId};
use plan_relations::Direction;

/// Declare "after `a`, `b` must happen within `[min,max]`" (spec
/// §4.5). Negative values invert the relation: `add(a,b,-max,-min)`
/// is equivalent to `add(b,a,min,max)`.
///
/// Unlike the source's symmetric pair of edges, this stores a single
/// canonical `src -> dst` edge; the "backward" direction named in the
/// spec's contracts is read straight off that edge's *incoming*
/// adjacency at `dst`, so there is no second edge to keep in sync.
pub fn add_temporal_constraint(
    plan: &mut Plan,
    a: PlanObjectId,
    b: PlanObjectId,
    min: i64,
    max: i64,
) -> Result<()> {
    if min > max {
        return Err(TemporalError::InvalidConstraint(format!(
            "min ({}) must be <= max ({})",
            min, max
        )));
    }
    let (src, dst, lo, hi) = if max < 0 { (b, a, -max, -min) } else { (a, b, min, max) };

    let relation = plan_core::relations::temporal_constraint();
    let mut set = read_constraint(plan, src, dst)?.unwrap_or_default();
    set.merge(&TemporalConstraintSet::with_interval(lo, hi));
    // `embeds_info` requires equal payloads on re-insertion; remove and
    // re-add rather than trying to merge through the substrate.
    plan.remove_event_edge(&relation, src, dst)?;
    plan.add_event_edge(&relation, src, dst, Some(serde_json::to_value(&set).expect("serializable")))?;
    Ok(())
}

fn read_constraint(plan: &Plan, from: PlanObjectId, to: PlanObjectId) -> Result<Option<TemporalConstraintSet>> {
    let relation = plan_core::relations::temporal_constraint();
    let info = plan
        .relations_event
        .edge_info(&relation, from.to_node_ref(), to.to_node_ref())?;
    Ok(info
        .map(|v| serde_json::from_value(v.clone()).expect("edges only ever carry TemporalConstraintSet payloads")))
}

/// Call once for every event generator that emitted this cycle, after
/// its emission has been recorded in its history.
///
/// Handles both roles the emission plays: as the *source* of forward
/// constraints (schedule deadlines for successors that have not yet
/// satisfied them) and as the *target* of constraints from
/// predecessors (consume a pending deadline, check the constraint was
/// actually satisfied).
pub fn on_emission(plan: &mut Plan, emitted: PlanObjectId, now: u64) -> Result<Vec<TemporalError>> {
    let mut errors = Vec::new();
    schedule_successors(plan, emitted, now)?;
    check_predecessors(plan, emitted, now, &mut errors)?;
    Ok(errors)
}

fn schedule_successors(plan: &mut Plan, source: PlanObjectId, now: u64) -> Result<()> {
    let relation = plan_core::relations::temporal_constraint();
    let targets = plan.event_neighbors(&relation, source, Direction::Outgoing)?;
    for target in targets {
        let Some(set) = read_constraint(plan, source, target)? else { continue };
        let satisfied = plan
            .event(target)
            .map(|g| g.history().any(|e| set.intervals.contains(e.time as i64 - now as i64)))
            .unwrap_or(false);
        if satisfied {
            continue;
        }
        let Some(hi) = set.intervals.max_bound() else { continue };
        if hi < 0 {
            continue; // a purely backward-looking constraint never schedules a future deadline
        }
        plan.deadlines_mut().add(DeadlineEntry {
            deadline_time: now + hi as u64,
            source_emission_time: now,
            source,
            target,
        });
    }
    Ok(())
}

fn check_predecessors(
    plan: &mut Plan,
    target: PlanObjectId,
    now: u64,
    errors: &mut Vec<TemporalError>,
) -> Result<()> {
    let relation = plan_core::relations::temporal_constraint();
    let preds = plan.event_neighbors(&relation, target, Direction::Incoming)?;
    for pred in preds {
        plan.deadlines_mut().remove_for(pred, now);
        let Some(set) = read_constraint(plan, pred, target)? else { continue };
        let Some(last) = plan.event(pred).and_then(|g| g.last_emission()).cloned() else {
            continue; // pred never emitted; nothing to check yet
        };
        let diff = now as i64 - last.time as i64;
        if !set.intervals.is_empty() && !set.intervals.contains(diff) {
            tracing::warn!(?pred, ?target, diff, "temporal constraint violated");
            errors.push(TemporalError::TemporalConstraintViolation {
                from: pred,
                target,
                diff,
            });
        }
        if let Some(&(min, max)) = set.occurrence_constraints.get(&false) {
            let count = plan.event(target).map(|g| g.history().count() as u32).unwrap_or(0);
            if count < min || count > max {
                tracing::warn!(?target, count, min, max, "occurrence constraint violated");
                errors.push(TemporalError::OccurrenceConstraintViolation {
                    generator: target,
                    count,
                    min,
                    max,
                });
            }
        }
    }
    Ok(())
}

/// Drain every deadline that has passed `now` and turn it into a
/// [`TemporalError::MissedDeadlineError`], for `check_structural_constraints`
/// to raise each cycle (spec §4.5).
pub fn drain_missed(plan: &mut Plan, now: u64) -> Vec<TemporalError> {
    plan.deadlines_mut()
        .missed(now)
        .into_iter()
        .map(|entry| TemporalError::MissedDeadlineError {
            generator: entry.target,
            from: entry.source,
            deadline: entry.deadline_time,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_event(plan: &mut Plan) -> PlanObjectId {
        plan.add_free_event("generic", true).unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut plan = Plan::new();
        let a = bound_event(&mut plan);
        let b = bound_event(&mut plan);
        assert!(add_temporal_constraint(&mut plan, a, b, 3, 1).is_err());
    }
}
