use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_market_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS stocks (
    symbol TEXT PRIMARY KEY,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    exchange TEXT NOT NULL,
    sector TEXT NOT NULL,
    industry TEXT NOT NULL,
    price DECIMAL(18,4) NOT NULL,
    currency TEXT NOT NULL,
    market_cap DECIMAL(24,4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_us BIGINT NOT NULL,
    updated_us BIGINT
);

CREATE TABLE IF NOT EXISTS ticks (
    id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    price DECIMAL(18,4) NOT NULL,
    volume BIGINT NOT NULL,
    high DECIMAL(18,4) NOT NULL,
    low DECIMAL(18,4) NOT NULL,
    open DECIMAL(18,4) NOT NULL,
    previous_close DECIMAL(18,4) NOT NULL,
    currency TEXT NOT NULL,
    ts_us BIGINT NOT NULL
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_ticks_symbol_ts ON ticks(symbol, ts_us);
CREATE INDEX IF NOT EXISTS idx_ticks_ts ON ticks(ts_us);
"#,
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
