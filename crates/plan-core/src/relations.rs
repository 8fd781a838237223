//! Standard relation classes declared by every plan (spec §3, §4.1,
//! §4.5, §4.6).

use plan_relations::{RelationClass, RelationId, RelationPolicy, RelationRegistry};

/// Task-space relation: `p --depends_on--> c`, a weak DAG edge
/// (spec §4.4, "Dependency failures").
pub const DEPENDS_ON: &str = "depends_on";
/// Task-space relation: error handling edges; strong, never rewritten
/// by a replacement (spec §8 scenario 2).
pub const ERR_HANDLED_BY: &str = "err_handled_by";
/// Task-space relation mirroring [`SCHEDULING_CONSTRAINT`] at task
/// granularity (spec §4.5, "Scheduling constraints").
pub const TASK_SCHEDULING_CONSTRAINT: &str = "task_scheduling_constraint";
/// Task-space relation: `placeholder --planning_task--> job`, linking
/// a job's user-visible placeholder to the task that elaborates it
/// (spec §4.4, "Jobs").
pub const PLANNING_TASK: &str = "planning_task";

/// Event-space relation, superset of [`CAUSAL_LINK`] (spec §8
/// scenario 1).
pub const PRECEDENCE: &str = "precedence";
/// Event-space relation, subset of [`PRECEDENCE`].
pub const CAUSAL_LINK: &str = "causal_link";
/// Event-space relation: non-controllable propagation (spec §4.3).
pub const FORWARD_TO: &str = "forward_to";
/// Event-space relation: calls the target when the source emits
/// (spec §4.3).
pub const SIGNALS: &str = "signals";
/// Event-space relation: "schedule b as if it were a" (spec §4.5).
pub const SCHEDULING_CONSTRAINT: &str = "scheduling_constraint";
/// Event-space relation carrying serialized `TemporalConstraintSet`
/// payloads (spec §4.5); `embeds_info` so conflicting payloads are
/// caught by the substrate.
pub const TEMPORAL_CONSTRAINT: &str = "temporal_constraint";

/// Build the task-space relation registry declared by spec §4.2/§4.4.
pub fn task_registry() -> RelationRegistry {
    let mut reg = RelationRegistry::new();
    reg.register(RelationClass::new(DEPENDS_ON, RelationPolicy::weak_dag()))
        .expect("static registration");
    reg.register(RelationClass::new(ERR_HANDLED_BY, RelationPolicy::strong()))
        .expect("static registration");
    reg.register(RelationClass::new(
        TASK_SCHEDULING_CONSTRAINT,
        RelationPolicy::weak(),
    ))
    .expect("static registration");
    reg.register(RelationClass::new(PLANNING_TASK, RelationPolicy::weak()))
        .expect("static registration");
    reg
}

/// Build the event-space relation registry declared by spec
/// §4.3/§4.5/§8 scenario 1.
pub fn event_registry() -> RelationRegistry {
    let mut reg = RelationRegistry::new();
    reg.register(RelationClass::new(PRECEDENCE, RelationPolicy::weak()))
        .expect("static registration");
    reg.register(
        RelationClass::new(CAUSAL_LINK, RelationPolicy::weak()).subset_of(PRECEDENCE),
    )
    .expect("static registration");
    reg.register(RelationClass::new(FORWARD_TO, RelationPolicy::weak()))
        .expect("static registration");
    reg.register(RelationClass::new(SIGNALS, RelationPolicy::weak()))
        .expect("static registration");
    reg.register(RelationClass::new(
        SCHEDULING_CONSTRAINT,
        RelationPolicy::weak(),
    ))
    .expect("static registration");
    reg.register(RelationClass::new(
        TEMPORAL_CONSTRAINT,
        RelationPolicy {
            embeds_info: true,
            ..RelationPolicy::weak()
        },
    ))
    .expect("static registration");
    reg
}

pub fn depends_on() -> RelationId {
    RelationId::new(DEPENDS_ON)
}
pub fn err_handled_by() -> RelationId {
    RelationId::new(ERR_HANDLED_BY)
}
pub fn precedence() -> RelationId {
    RelationId::new(PRECEDENCE)
}
pub fn causal_link() -> RelationId {
    RelationId::new(CAUSAL_LINK)
}
pub fn forward_to() -> RelationId {
    RelationId::new(FORWARD_TO)
}
pub fn signals() -> RelationId {
    RelationId::new(SIGNALS)
}
pub fn scheduling_constraint() -> RelationId {
    RelationId::new(SCHEDULING_CONSTRAINT)
}
pub fn temporal_constraint() -> RelationId {
    RelationId::new(TEMPORAL_CONSTRAINT)
}
pub fn task_scheduling_constraint() -> RelationId {
    RelationId::new(TASK_SCHEDULING_CONSTRAINT)
}
pub fn planning_task() -> RelationId {
    RelationId::new(PLANNING_TASK)
}
