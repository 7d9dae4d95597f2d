//! Long-running tick simulation worker.
//!
//! The worker moves through [`WorkerState`] in order: it waits out the initial
//! delay, probes the store until it reports healthy, makes sure the seed
//! catalog exists, then runs one cycle per interval until shut down. A failed
//! cycle is logged and followed by the longer error cooldown; only the initial
//! readiness failure stops the worker with an error.

mod seed;
mod tracker;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::ingestion::{DeliveryReport, IngestionChannel};
use crate::price_walk::{PriceWalk, RandomSource, RngSource};
use crate::retry::ProbePolicy;
use crate::settings::SimulationSettings;
use crate::store::{MarketStore, StockFilter};
use crate::{IngestionError, SimulationError, Stock, StoreError, Tick, ValidationError};

pub use seed::{SeedStock, SEED_STOCKS};
pub use tracker::PriceTracker;

/// Lifecycle of a [`SimulationWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Starting,
    WaitingForDependency,
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// Cooperative cancellation shared between the worker and whoever stops it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`Shutdown::trigger`] has been called.
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        if receiver.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Totals returned when the worker stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerReport {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub ticks_generated: u64,
    pub ticks_delivered: u64,
}

/// Result of a single successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub generated: usize,
    pub delivery: DeliveryReport,
}

pub struct SimulationWorker<S> {
    store: S,
    channel: IngestionChannel<S>,
    walk: PriceWalk,
    rng: Box<dyn RandomSource>,
    settings: SimulationSettings,
    probe: ProbePolicy,
    seeds: Vec<SeedStock>,
    max_cycles: Option<u64>,
    tracker: PriceTracker,
    state: watch::Sender<WorkerState>,
}

impl<S: MarketStore + Clone> SimulationWorker<S> {
    /// Build a worker from validated settings. Randomness is seeded from
    /// `settings.seed` when present, otherwise from the OS.
    pub fn new(store: S, settings: SimulationSettings) -> Result<Self, SimulationError> {
        settings.validate()?;
        let walk = PriceWalk::new(settings.price_walk_config())?;
        let rng: Box<dyn RandomSource> = match settings.seed {
            Some(seed) => Box::new(RngSource::seeded(seed)),
            None => Box::new(RngSource::from_entropy()),
        };
        let (state, _) = watch::channel(WorkerState::Starting);

        Ok(Self {
            channel: IngestionChannel::new(store.clone(), settings.delivery_mode()),
            store,
            walk,
            rng,
            probe: settings.probe_policy(),
            settings,
            seeds: SEED_STOCKS.to_vec(),
            max_cycles: None,
            tracker: PriceTracker::new(),
            state,
        })
    }

    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Stop on its own after `cycles` cycles, successful or not.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<SeedStock>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn tracker(&self) -> &PriceTracker {
        &self.tracker
    }

    /// Drive the worker until `shutdown` fires or the cycle bound is reached.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<WorkerReport, SimulationError> {
        let mut report = WorkerReport::default();
        tracing::info!(
            interval_seconds = self.settings.interval_seconds,
            batch_mode = self.settings.enable_batch_mode,
            "simulation worker starting"
        );

        self.transition(WorkerState::WaitingForDependency);
        if !self.pause(self.settings.initial_delay(), shutdown).await {
            return Ok(self.stop(report));
        }
        match self.wait_for_dependency(shutdown).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.stop(report)),
            Err(error) => {
                tracing::error!(%error, "ingestion target unavailable, stopping simulation");
                self.transition(WorkerState::Stopped);
                return Err(error);
            }
        }

        self.transition(WorkerState::Initializing);
        self.initialize().await;

        self.transition(WorkerState::Running);
        while !shutdown.is_triggered() {
            let pause = match self.run_cycle().await {
                Ok(cycle) => {
                    report.cycles_completed += 1;
                    report.ticks_generated += cycle.generated as u64;
                    report.ticks_delivered += cycle.delivery.ticks_written as u64;
                    self.settings.interval()
                }
                Err(error) => {
                    report.cycles_failed += 1;
                    tracing::error!(%error, "simulation cycle failed");
                    self.settings.error_cooldown()
                }
            };

            let finished = report.cycles_completed + report.cycles_failed;
            if self.max_cycles.is_some_and(|max| finished >= max) {
                break;
            }
            if !self.pause(pause, shutdown).await {
                break;
            }
        }

        Ok(self.stop(report))
    }

    /// Generate one tick per active stock and deliver them.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, IngestionError> {
        let stocks = self.store.list_stocks(StockFilter::active()).await?;
        if stocks.is_empty() {
            tracing::warn!("no active stocks to simulate");
            return Ok(CycleReport::default());
        }

        let mut batch = Vec::with_capacity(stocks.len());
        for stock in &stocks {
            match self.next_tick(stock) {
                Ok(tick) => {
                    self.tracker.set(tick.symbol.clone(), tick.price.value());
                    batch.push(tick);
                }
                Err(error) => {
                    tracing::warn!(symbol = %stock.symbol, %error, "failed to generate tick");
                }
            }
        }

        let generated = batch.len();
        let delivery = self.channel.deliver(batch).await?;
        tracing::info!(
            generated,
            written = delivery.ticks_written,
            mode = ?self.channel.mode(),
            "simulation cycle delivered"
        );
        Ok(CycleReport {
            generated,
            delivery,
        })
    }

    fn next_tick(&mut self, stock: &Stock) -> Result<Tick, ValidationError> {
        let current = self
            .tracker
            .get_or_adopt(&stock.symbol, stock.current_price.value());
        let raw = self.walk.next_tick(current, self.rng.as_mut())?;
        let volume = i64::try_from(raw.volume)
            .map_err(|_| ValidationError::UnrepresentableValue { field: "volume" })?;

        Tick::create_in(
            stock.current_price.currency(),
            stock.symbol.as_str(),
            raw.price,
            volume,
            raw.high,
            raw.low,
            raw.open,
            raw.previous_close,
            None,
        )
    }

    /// `Ok(false)` when shut down while probing.
    async fn wait_for_dependency(&self, shutdown: &Shutdown) -> Result<bool, SimulationError> {
        let attempts = self.probe.max_attempts;
        for attempt in 0..attempts {
            if shutdown.is_triggered() {
                return Ok(false);
            }
            let healthy = tokio::select! {
                healthy = self.store.health() => healthy,
                _ = shutdown.triggered() => return Ok(false),
            };
            if healthy {
                tracing::info!(attempt = attempt + 1, "ingestion target is healthy");
                return Ok(true);
            }
            tracing::warn!(
                attempt = attempt + 1,
                max = attempts,
                "health check failed, retrying"
            );
            if attempt + 1 < attempts
                && !self.pause(self.probe.delay_for_attempt(attempt), shutdown).await
            {
                return Ok(false);
            }
        }
        Err(SimulationError::DependencyUnavailable { attempts })
    }

    /// Create missing seed stocks and seed the tracker from whatever the store holds.
    async fn initialize(&mut self) {
        for seed in self.seeds.clone() {
            if let Err(error) = self.ensure_seed(&seed).await {
                tracing::error!(symbol = seed.symbol, %error, "failed to initialize stock");
            }
        }
        tracing::info!(tracked = self.tracker.len(), "stock initialization completed");
    }

    async fn ensure_seed(&mut self, seed: &SeedStock) -> Result<(), StoreError> {
        let stock = seed.to_stock()?;
        if let Some(existing) = self.store.get_stock(&stock.symbol).await? {
            tracing::info!(symbol = %existing.symbol, price = %existing.current_price, "stock already exists");
            self.tracker
                .set(existing.symbol, existing.current_price.value());
            return Ok(());
        }

        let symbol = stock.symbol.clone();
        let price = stock.current_price.value();
        match self.store.create_stock(stock).await {
            Ok(_) => {
                tracing::info!(symbol = %symbol, %price, "created stock");
                self.tracker.set(symbol, price);
                Ok(())
            }
            Err(StoreError::Conflict { .. }) => {
                // Created concurrently; adopt the stored price.
                if let Some(existing) = self.store.get_stock(&symbol).await? {
                    self.tracker.set(symbol, existing.current_price.value());
                }
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Sleep for `duration`; `false` when shutdown fired first.
    async fn pause(&self, duration: Duration, shutdown: &Shutdown) -> bool {
        if shutdown.is_triggered() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = shutdown.triggered() => false,
        }
    }

    fn transition(&self, next: WorkerState) {
        tracing::debug!(state = ?next, "simulation worker state");
        self.state.send_replace(next);
    }

    fn stop(&self, report: WorkerReport) -> WorkerReport {
        self.transition(WorkerState::Stopping);
        tracing::info!(
            cycles = report.cycles_completed,
            failed = report.cycles_failed,
            ticks = report.ticks_generated,
            "simulation worker stopping"
        );
        self.transition(WorkerState::Stopped);
        report
    }
}
