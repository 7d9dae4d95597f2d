use serde::Serialize;
use serde_json::Value;
use tickforge_core::SymbolActivity;

use crate::error::CliError;

use super::Backend;

#[derive(Debug, Serialize)]
struct ActivityResponseData {
    symbols: Vec<SymbolActivity>,
}

pub async fn run(backend: &Backend) -> Result<Value, CliError> {
    let Backend::Warehouse(store) = backend else {
        return Err(CliError::Command(String::from(
            "activity reads warehouse views; use --store warehouse",
        )));
    };

    let warehouse = store.warehouse().clone();
    let symbols = tokio::task::spawn_blocking(move || warehouse.symbol_activity())
        .await
        .map_err(|error| CliError::Command(format!("activity query task failed: {error}")))??;
    Ok(serde_json::to_value(ActivityResponseData { symbols })?)
}
