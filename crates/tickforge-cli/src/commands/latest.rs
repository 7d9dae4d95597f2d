use serde_json::Value;
use tickforge_core::MarketStore;

use crate::cli::SymbolArgs;
use crate::error::CliError;

use super::{parse_symbol, Backend};

pub async fn run(args: &SymbolArgs, backend: &Backend) -> Result<Value, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let tick = backend
        .store()
        .latest_tick(&symbol)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("no ticks recorded for '{symbol}'")))?;
    Ok(serde_json::to_value(tick)?)
}
