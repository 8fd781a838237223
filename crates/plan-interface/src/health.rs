//! A thin health-check surface for external monitors, separate from
//! the command/observe protocol proper (spec §6 doesn't name this
//! explicitly; it is the ambient liveness surface every long-running
//! service in this stack exposes).

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    last_cycle: u64,
}

/// Shared cycle counter the engine loop bumps after every `cycle_end`;
/// the health handler only ever reads it.
#[derive(Clone, Default)]
pub struct HealthState {
    last_cycle: Arc<AtomicU64>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, cycle_number: u64) {
        self.last_cycle.store(cycle_number, Ordering::Relaxed);
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/healthz", get(healthz)).with_state(state)
}

async fn healthz(axum::extract::State(state): axum::extract::State<HealthState>) -> Json<HealthBody> {
    Json(HealthBody { status: "ok", last_cycle: state.last_cycle.load(Ordering::Relaxed) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_cycle_number() {
        let state = HealthState::new();
        state.record_cycle(42);
        assert_eq!(state.last_cycle.load(Ordering::Relaxed), 42);
    }
}
