use serde::Serialize;
use serde_json::Value;
use tickforge_core::{Settings, Shutdown, SimulationWorker, WorkerReport, WorkerState};

use crate::cli::SimulateArgs;
use crate::error::CliError;

use super::Backend;

#[derive(Debug, Serialize)]
struct SimulateResponseData {
    state: WorkerState,
    report: WorkerReport,
    tracked_symbols: usize,
}

/// Command-line flags are the last configuration layer.
pub fn apply_overrides(settings: &mut Settings, args: &SimulateArgs) {
    let sim = &mut settings.simulation;
    if let Some(interval) = args.interval {
        sim.interval_seconds = interval;
    }
    if let Some(delay) = args.initial_delay {
        sim.initial_delay_seconds = delay;
    }
    if let Some(min) = args.min_change {
        sim.min_price_change_percent = min;
    }
    if let Some(max) = args.max_change {
        sim.max_price_change_percent = max;
    }
    if let Some(min) = args.min_volume {
        sim.min_volume = min;
    }
    if let Some(max) = args.max_volume {
        sim.max_volume = max;
    }
    if args.per_item {
        sim.enable_batch_mode = false;
    }
    if args.seed.is_some() {
        sim.seed = args.seed;
    }
}

pub async fn run(
    args: &SimulateArgs,
    backend: &Backend,
    settings: &Settings,
) -> Result<Value, CliError> {
    let mut worker = SimulationWorker::new(backend.store(), settings.simulation.clone())?;
    if let Some(cycles) = args.cycles {
        worker = worker.with_max_cycles(cycles);
    }
    let state = worker.state();

    let shutdown = Shutdown::new();
    let on_signal = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing current cycle");
            on_signal.trigger();
        }
    });

    let outcome = worker.run(&shutdown).await;
    signal_task.abort();
    let report = outcome?;

    let final_state = *state.borrow();
    Ok(serde_json::to_value(SimulateResponseData {
        state: final_state,
        report,
        tracked_symbols: worker.tracker().len(),
    })?)
}
