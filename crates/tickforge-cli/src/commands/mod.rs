mod activity;
mod history;
mod latest;
mod simulate;
mod stats;
mod stocks;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tickforge_core::{
    HttpMarketStore, InMemoryStore, MarketStore, Settings, StockSymbol, ValidatedStore, Warehouse,
    WarehouseConfig, WarehouseStore,
};

use crate::cli::{Cli, Command, StoreKind};
use crate::error::CliError;

/// Store handed to commands: validation in front of the selected backend.
pub type SharedStore = ValidatedStore<Arc<dyn MarketStore>>;

/// The opened backend, kept concrete for backend-specific commands.
pub enum Backend {
    Warehouse(WarehouseStore),
    Http(HttpMarketStore),
    Memory(InMemoryStore),
}

impl Backend {
    pub fn open(kind: StoreKind, db: Option<&Path>, settings: &Settings) -> Result<Self, CliError> {
        match kind {
            StoreKind::Warehouse => {
                let config = match db {
                    Some(path) => warehouse_config_for(path),
                    None => WarehouseConfig::default(),
                };
                let warehouse = Warehouse::open(config)?;
                tracing::debug!(db = %warehouse.db_path().display(), "warehouse opened");
                Ok(Self::Warehouse(WarehouseStore::new(warehouse)))
            }
            StoreKind::Http => Ok(Self::Http(
                HttpMarketStore::new(settings.api.base_url.clone())
                    .with_timeout_ms(settings.api.timeout_ms()),
            )),
            StoreKind::Memory => Ok(Self::Memory(InMemoryStore::new())),
        }
    }

    pub fn store(&self) -> SharedStore {
        let inner: Arc<dyn MarketStore> = match self {
            Self::Warehouse(store) => Arc::new(store.clone()),
            Self::Http(store) => Arc::new(store.clone()),
            Self::Memory(store) => Arc::new(store.clone()),
        };
        ValidatedStore::new(inner)
    }
}

fn warehouse_config_for(path: &Path) -> WarehouseConfig {
    let home = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    WarehouseConfig {
        tickforge_home: home,
        db_path: path.to_path_buf(),
        ..WarehouseConfig::default()
    }
}

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Command::Simulate(args) = &cli.command {
        simulate::apply_overrides(&mut settings, args);
    }
    settings.validate()?;

    let backend = Backend::open(cli.store, cli.db.as_deref(), &settings)?;

    match &cli.command {
        Command::Simulate(args) => simulate::run(args, &backend, &settings).await,
        Command::Stats(args) => stats::run(args, &backend).await,
        Command::Stocks(args) => stocks::run(args, &backend).await,
        Command::Latest(args) => latest::run(args, &backend).await,
        Command::History(args) => history::run(args, &backend).await,
        Command::Activity => activity::run(&backend).await,
    }
}

fn parse_symbol(raw: &str) -> Result<StockSymbol, CliError> {
    Ok(StockSymbol::parse(raw)?)
}
