//! Behavior-driven tests for the simulation worker
//!
//! These tests verify the worker lifecycle against an in-memory store: seeding
//! the catalog, generating one tick per active stock per cycle, waiting for an
//! unhealthy store, recovering from failed cycles and stopping on shutdown.
//! Time is paused so intervals and cooldowns elapse instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal_macros::dec;
use tickforge_core::store::{ProbeFuture, StoreFuture};
use tickforge_core::{
    Backoff, InMemoryStore, MarketStore, Price, ScriptedSource, SeedStock, Shutdown,
    SimulationError, SimulationSettings, SimulationWorker, Stock, StockFilter, StockSymbol,
    StoreError, Tick, TickWindow, WorkerState, SEED_STOCKS,
};
use tokio::time::Instant;
use uuid::Uuid;

/// Wraps an [`InMemoryStore`], counts stock creations, stamps every stock
/// listing and can fail the first listings or hang on health checks.
#[derive(Clone)]
struct ObservedStore {
    inner: InMemoryStore,
    creates: Arc<AtomicUsize>,
    listings: Arc<Mutex<Vec<Instant>>>,
    failing_listings: Arc<AtomicUsize>,
    hang_on_health: bool,
}

impl ObservedStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            creates: Arc::new(AtomicUsize::new(0)),
            listings: Arc::new(Mutex::new(Vec::new())),
            failing_listings: Arc::new(AtomicUsize::new(0)),
            hang_on_health: false,
        }
    }

    fn failing_first_listings(inner: InMemoryStore, count: usize) -> Self {
        let store = Self::new(inner);
        store.failing_listings.store(count, Ordering::SeqCst);
        store
    }

    fn hanging_on_health(inner: InMemoryStore) -> Self {
        Self {
            hang_on_health: true,
            ..Self::new(inner)
        }
    }

    fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    fn listings(&self) -> Vec<Instant> {
        self.listings.lock().expect("lock").clone()
    }
}

impl MarketStore for ObservedStore {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        self.inner.get_stock(symbol)
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_stock(stock)
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        self.inner.update_stock_price(symbol, price)
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        self.listings.lock().expect("lock").push(Instant::now());
        let failing = self
            .failing_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Box::pin(async { Err(StoreError::transport("connection refused")) });
        }
        self.inner.list_stocks(filter)
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        self.inner.append_tick(tick)
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        self.inner.append_ticks(ticks)
    }

    fn recent_ticks<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        self.inner.recent_ticks(limit)
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        self.inner.latest_tick(symbol)
    }

    fn symbol_ticks<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        self.inner.symbol_ticks(symbol, window)
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        if self.hang_on_health {
            return Box::pin(std::future::pending());
        }
        self.inner.health()
    }
}

fn settings() -> SimulationSettings {
    SimulationSettings {
        initial_delay_seconds: 0,
        interval_seconds: 5,
        seed: Some(42),
        ..SimulationSettings::default()
    }
}

fn apple_seed() -> Vec<SeedStock> {
    SEED_STOCKS
        .iter()
        .copied()
        .filter(|seed| seed.symbol == "AAPL")
        .collect()
}

fn symbol(raw: &str) -> StockSymbol {
    StockSymbol::parse(raw).expect("symbol")
}

// =============================================================================
// Initialization
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_store_is_empty_then_the_full_catalog_is_created() {
    // Given: An empty store
    let store = InMemoryStore::new();
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_max_cycles(1);

    // When: Running one cycle
    let report = worker.run(&Shutdown::new()).await.expect("run");

    // Then: All ten stocks exist and each got one tick
    let stocks = store.list_stocks(StockFilter::all()).await.expect("list");
    assert_eq!(stocks.len(), SEED_STOCKS.len());
    assert_eq!(report.ticks_generated, 10);
    assert_eq!(report.ticks_delivered, 10);
    assert_eq!(worker.tracker().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn when_seed_stock_already_exists_then_its_stored_price_is_kept() {
    // Given: AAPL already stored at 180.00
    let store = InMemoryStore::new();
    let existing = Stock::create(
        "AAPL",
        "Apple Inc.",
        "NASDAQ",
        "Technology",
        "Consumer Electronics",
        dec!(180.00),
    )
    .expect("stock");
    let existing_id = existing.id;
    store.create_stock(existing).await.expect("create");

    // And: Draws that leave the price flat
    let observed = ObservedStore::new(store.clone());
    let mut worker = SimulationWorker::new(observed.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_random_source(Box::new(ScriptedSource::new(
            vec![0.0, 0.0, 0.0],
            vec![250_000],
        )))
        .with_max_cycles(1);

    // When: Running one cycle
    worker.run(&Shutdown::new()).await.expect("run");

    // Then: No creation was attempted and the walk started from 180.00
    assert_eq!(observed.creates(), 0);
    let stocks = store.list_stocks(StockFilter::all()).await.expect("list");
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].id, existing_id);
    assert_eq!(worker.tracker().get(&symbol("AAPL")), Some(dec!(180.00)));

    let tick = store
        .latest_tick(&symbol("AAPL"))
        .await
        .expect("latest")
        .expect("one tick");
    assert_eq!(tick.previous_close.value(), dec!(180.00));
    assert_eq!(tick.volume.value(), 250_000);
}

#[tokio::test(start_paused = true)]
async fn when_stock_is_added_later_then_the_next_cycle_picks_it_up() {
    // Given: A worker seeded with AAPL only, and NFLX added directly to the store
    let store = InMemoryStore::new();
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(1);
    let netflix = Stock::create(
        "NFLX",
        "Netflix Inc.",
        "NASDAQ",
        "Communication Services",
        "Entertainment",
        dec!(612.40),
    )
    .expect("stock");
    store.create_stock(netflix).await.expect("create");

    // When: Running one cycle
    let report = worker.run(&Shutdown::new()).await.expect("run");

    // Then: Both active stocks get a tick and NFLX starts from its stored price
    assert_eq!(report.ticks_generated, 2);
    let tick = store
        .latest_tick(&symbol("NFLX"))
        .await
        .expect("latest")
        .expect("tick");
    assert_eq!(tick.open.value(), dec!(612.40));
}

// =============================================================================
// Cycles
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_prices_walk_across_cycles_then_each_tick_opens_at_the_last_price() {
    // Given: A single-stock catalog
    let store = InMemoryStore::new();
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(4);

    // When: Running four cycles
    let report = worker.run(&Shutdown::new()).await.expect("run");

    // Then: Ticks chain, each previous close equals the prior tick's price
    assert_eq!(report.cycles_completed, 4);
    let mut history = store
        .symbol_ticks(&symbol("AAPL"), Default::default())
        .await
        .expect("history");
    history.reverse();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].previous_close.value(), dec!(175.50));
    for pair in history.windows(2) {
        assert_eq!(pair[1].previous_close, pair[0].price);
    }

    let stock = store
        .get_stock(&symbol("AAPL"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stock.current_price, history[3].price);
}

#[tokio::test(start_paused = true)]
async fn when_a_cycle_fails_then_the_next_one_still_delivers() {
    // Given: A worker over a seeded store
    let store = InMemoryStore::new();
    for seed in apple_seed() {
        store
            .create_stock(seed.to_stock().expect("stock"))
            .await
            .expect("create");
    }
    let mut worker = SimulationWorker::new(store.clone(), settings()).expect("worker");

    // When: One cycle runs during an outage and one after it
    store.set_available(false);
    let failed = worker.run_cycle().await;
    store.set_available(true);
    let recovered = worker.run_cycle().await.expect("second cycle");

    // Then: Only the second cycle wrote a tick
    assert!(failed.is_err());
    assert_eq!(recovered.generated, 1);
    assert_eq!(store.tick_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn when_a_cycle_fails_inside_the_loop_then_the_worker_cools_down_and_continues() {
    // Given: A store whose first stock listing fails
    let store = ObservedStore::failing_first_listings(InMemoryStore::new(), 1);
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(2);

    // When: Running two cycles
    let report = worker.run(&Shutdown::new()).await.expect("run");

    // Then: One cycle failed, one delivered, and the error cooldown separated them
    assert_eq!(report.cycles_failed, 1);
    assert_eq!(report.cycles_completed, 1);
    assert_eq!(report.ticks_delivered, 1);
    let listings = store.listings();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[1] - listings[0], Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn when_seeds_are_equal_then_runs_are_reproducible() {
    // Given: Two workers with the same seed on separate stores
    let first_store = InMemoryStore::new();
    let second_store = InMemoryStore::new();
    let mut first = SimulationWorker::new(first_store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(3);
    let mut second = SimulationWorker::new(second_store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(3);

    // When: Both run three cycles
    first.run(&Shutdown::new()).await.expect("run");
    second.run(&Shutdown::new()).await.expect("run");

    // Then: They tracked the same price
    assert_eq!(
        first.tracker().get(&symbol("AAPL")),
        second.tracker().get(&symbol("AAPL"))
    );
}

// =============================================================================
// Dependency and Shutdown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_store_never_becomes_healthy_then_worker_stops_with_an_error() {
    // Given: A store that is down for good
    let store = InMemoryStore::new();
    store.set_available(false);
    let mut worker = SimulationWorker::new(store.clone(), settings()).expect("worker");
    let state = worker.state();

    // When: Running
    let err = worker.run(&Shutdown::new()).await.expect_err("unavailable");

    // Then: The configured number of probes was spent and nothing was written
    assert_eq!(err, SimulationError::DependencyUnavailable { attempts: 10 });
    assert_eq!(*state.borrow(), WorkerState::Stopped);
    assert_eq!(store.tick_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn when_store_recovers_during_probing_then_worker_proceeds() {
    // Given: A store that comes back after twelve seconds
    let store = InMemoryStore::new();
    store.set_available(false);
    let reviver = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        reviver.set_available(true);
    });
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed())
        .with_max_cycles(1);

    // When: Running
    let report = worker.run(&Shutdown::new()).await.expect("run");

    // Then: The worker waited and then completed its cycle
    assert_eq!(report.cycles_completed, 1);
    assert_eq!(store.tick_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn when_shutdown_fires_between_cycles_then_worker_stops_cleanly() {
    // Given: A worker with no cycle bound
    let store = InMemoryStore::new();
    let shutdown = Shutdown::new();
    let mut worker = SimulationWorker::new(store.clone(), settings())
        .expect("worker")
        .with_seeds(apple_seed());
    let state = worker.state();

    // When: Shutdown fires twelve seconds in, during the third interval pause
    let stopper = shutdown.clone();
    let (result, ()) = tokio::join!(worker.run(&shutdown), async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        stopper.trigger();
    });

    // Then: The cycles at 0s, 5s and 10s ran and the worker reports stopped
    let report = result.expect("run");
    assert_eq!(report.cycles_completed, 3);
    assert_eq!(report.cycles_failed, 0);
    assert_eq!(store.tick_count().await, 3);
    assert_eq!(*state.borrow(), WorkerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn when_health_backoff_is_exponential_then_probes_wait_longer_each_time() {
    // Given: A store that stays down and a doubling backoff capped at four seconds
    let store = InMemoryStore::new();
    store.set_available(false);
    let settings = SimulationSettings {
        health_check_attempts: 4,
        health_check_backoff: Some(Backoff::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(4),
            jitter: false,
        }),
        ..settings()
    };
    let mut worker = SimulationWorker::new(store, settings).expect("worker");
    let started = Instant::now();

    // When: Running
    let err = worker.run(&Shutdown::new()).await.expect_err("unavailable");

    // Then: Four probes were spent with 1s, 2s and 4s between them
    assert_eq!(err, SimulationError::DependencyUnavailable { attempts: 4 });
    assert_eq!(started.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn when_shutdown_fires_during_a_health_check_then_the_check_is_abandoned() {
    // Given: A store whose health check never answers
    let store = ObservedStore::hanging_on_health(InMemoryStore::new());
    let shutdown = Shutdown::new();
    let mut worker = SimulationWorker::new(store.clone(), settings()).expect("worker");
    let state = worker.state();
    let started = Instant::now();

    // When: Shutdown fires one second into the check
    let stopper = shutdown.clone();
    let (result, ()) = tokio::join!(worker.run(&shutdown), async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        stopper.trigger();
    });

    // Then: The worker stops right away without running a cycle
    let report = result.expect("run");
    assert_eq!(report.cycles_completed, 0);
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert!(store.listings().is_empty());
    assert_eq!(*state.borrow(), WorkerState::Stopped);
}
