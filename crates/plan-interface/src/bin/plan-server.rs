//! Top-level binary: loads configuration, starts the health endpoint,
//! and drives the engine's synchronous cycle loop on a dedicated
//! blocking task (spec §5: "the engine's own control loop stays
//! synchronous and single-threaded, run on a dedicated blocking
//! task").

use anyhow::Context;
use plan_engine::{FaultTable, HandlerRegistry, JobTable};
use plan_interface::{health_router, CoreConfig, HealthState};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = std::env::var("PLAN_SERVER_CONFIG").unwrap_or_else(|_| "plan-server.toml".to_string());
    let config: CoreConfig = plan_interface::load_config(&config_path).unwrap_or_else(|err| {
        tracing::warn!(%err, path = %config_path, "no usable config file, running with defaults");
        CoreConfig::default()
    });
    tracing::info!(bind_address = %config.bind_address, cycle_period_ms = config.cycle_period_ms, "starting plan-server");

    let health_state = HealthState::new();
    let health_addr = format!("127.0.0.1:{}", config.health_port);
    let listener = tokio::net::TcpListener::bind(&health_addr)
        .await
        .with_context(|| format!("binding health endpoint on {health_addr}"))?;
    let health_state_for_loop = health_state.clone();
    let health_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, health_router(health_state)).await {
            tracing::error!(%err, "health endpoint server exited");
        }
    });

    let cycle_period = Duration::from_millis(config.cycle_period_ms);
    let cycle_loop =
        tokio::task::spawn_blocking(move || run_cycle_loop(cycle_period, health_state_for_loop));

    tokio::select! {
        res = health_server => { res.context("health server task panicked")?; }
        res = cycle_loop => { res.context("cycle loop task panicked")?; }
    }
    Ok(())
}

/// The engine's own loop: a plain synchronous `while true { run_cycle(...) }`
/// over an in-memory plan, sleeping between cycles. Action libraries
/// and external event sources attach here in a full deployment; this
/// binary runs an empty plan so the process is a complete, inspectable
/// skeleton rather than a stub that can't start.
fn run_cycle_loop(period: Duration, health_state: HealthState) {
    let mut plan = plan_core::Plan::new();
    let handlers = HandlerRegistry::new();
    let fault_table = FaultTable::new();
    let mut jobs = JobTable::new();
    let mut cycle_number = 0u64;
    let mut now = 0u64;

    loop {
        let notifications =
            plan_engine::run_cycle(&mut plan, now, cycle_number, Vec::new(), &[], &handlers, &fault_table, &mut jobs);
        for error in &notifications.fatal {
            tracing::error!(%error, "fatal execution error");
        }
        health_state.record_cycle(cycle_number);
        cycle_number += 1;
        now += period.as_millis() as u64;
        std::thread::sleep(period);
    }
}
