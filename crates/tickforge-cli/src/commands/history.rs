use serde::Serialize;
use serde_json::Value;
use tickforge_core::{MarketStore, StockSymbol, Tick, TickWindow, UtcDateTime};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{parse_symbol, Backend};

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    symbol: StockSymbol,
    window: WindowData,
    ticks: Vec<Tick>,
}

#[derive(Debug, Serialize)]
struct WindowData {
    from: Option<UtcDateTime>,
    to: Option<UtcDateTime>,
}

pub async fn run(args: &HistoryArgs, backend: &Backend) -> Result<Value, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let window = TickWindow {
        from: args.from.as_deref().map(UtcDateTime::parse).transpose()?,
        to: args.to.as_deref().map(UtcDateTime::parse).transpose()?,
    };
    if let (Some(from), Some(to)) = (window.from, window.to) {
        if from > to {
            return Err(CliError::Command(format!(
                "--from {from} is after --to {to}"
            )));
        }
    }

    let ticks = backend.store().symbol_ticks(&symbol, window).await?;
    Ok(serde_json::to_value(HistoryResponseData {
        symbol,
        window: WindowData {
            from: window.from,
            to: window.to,
        },
        ticks,
    })?)
}
