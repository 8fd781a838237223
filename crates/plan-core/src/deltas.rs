//! Plan-level change notifications.
//!
//! These are the plan-object/edge/status deltas named in spec §6's
//! log-stream packet list (`object_added`, `object_finalized`,
//! `edge_added`, `edge_removed`, `status_changed`); `event_emitted`
//! and `event_called` are produced by `plan-engine` instead, since
//! emission/calling is an engine concern (spec §4.3).

use crate::ids::PlanObjectId;
use plan_relations::RelationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusChange {
    Mission(bool),
    Permanent(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanDelta {
    ObjectAdded(PlanObjectId),
    ObjectFinalized(PlanObjectId),
    EdgeAdded {
        relation: String,
        from: PlanObjectId,
        to: PlanObjectId,
    },
    EdgeRemoved {
        relation: String,
        from: PlanObjectId,
        to: PlanObjectId,
    },
    StatusChanged {
        object: PlanObjectId,
        change: StatusChange,
    },
}

impl PlanDelta {
    pub fn edge_added(relation: &RelationId, from: PlanObjectId, to: PlanObjectId) -> Self {
        PlanDelta::EdgeAdded {
            relation: relation.0.clone(),
            from,
            to,
        }
    }

    pub fn edge_removed(relation: &RelationId, from: PlanObjectId, to: PlanObjectId) -> Self {
        PlanDelta::EdgeRemoved {
            relation: relation.0.clone(),
            from,
            to,
        }
    }
}
