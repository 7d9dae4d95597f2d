use serde::Serialize;
use serde_json::Value;
use tickforge_core::{MarketStore, Stock, StockFilter};

use crate::cli::StocksArgs;
use crate::error::CliError;

use super::Backend;

#[derive(Debug, Serialize)]
struct StocksResponseData {
    stocks: Vec<Stock>,
}

pub async fn run(args: &StocksArgs, backend: &Backend) -> Result<Value, CliError> {
    let filter = if args.active {
        StockFilter::active()
    } else {
        StockFilter::all()
    };
    let stocks = backend.store().list_stocks(filter).await?;
    Ok(serde_json::to_value(StocksResponseData { stocks })?)
}
