use serde_json::Value;
use tickforge_core::collect_statistics;

use crate::cli::StatsArgs;
use crate::error::CliError;

use super::Backend;

pub async fn run(args: &StatsArgs, backend: &Backend) -> Result<Value, CliError> {
    let statistics = match backend {
        // The API keeps no readable tick history; ask the server instead.
        Backend::Http(store) => store.market_statistics().await?,
        _ => collect_statistics(&backend.store(), args.sample).await?,
    };
    Ok(serde_json::to_value(statistics)?)
}
