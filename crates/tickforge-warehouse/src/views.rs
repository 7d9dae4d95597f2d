//! Database views for analytical queries.

use ::duckdb::Connection;

/// Create database views over the tick history.
///
/// Creates the following views:
/// - `vw_ticks`: ticks with a real timestamp and derived change columns
/// - `vw_latest_ticks`: the most recent tick per symbol
/// - `vw_symbol_activity`: tick count, traded volume and price range per symbol
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_ticks AS
SELECT
    id,
    symbol,
    make_timestamp(ts_us) AS ts,
    price,
    volume,
    high,
    low,
    open,
    previous_close,
    price - previous_close AS change,
    CASE
        WHEN previous_close = 0 THEN 0
        ELSE (price - previous_close) / previous_close * 100
    END AS change_percent,
    currency
FROM ticks;

CREATE OR REPLACE VIEW vw_latest_ticks AS
SELECT *
FROM (
    SELECT
        *,
        ROW_NUMBER() OVER (PARTITION BY symbol ORDER BY ts DESC) AS rn
    FROM vw_ticks
)
WHERE rn = 1;

CREATE OR REPLACE VIEW vw_symbol_activity AS
SELECT
    symbol,
    COUNT(*) AS tick_count,
    SUM(volume) AS total_volume,
    MIN(low) AS session_low,
    MAX(high) AS session_high,
    MIN(ts) AS first_ts,
    MAX(ts) AS last_ts
FROM vw_ticks
GROUP BY symbol;
",
    )?;

    Ok(())
}
