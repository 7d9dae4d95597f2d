use thiserror::Error;

/// Validation and contract errors exposed by `tickforge-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("timestamp is outside the representable range: {value}")]
    TimestampOutOfRange { value: i64 },

    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },
    #[error("field '{field}' cannot be represented as a decimal")]
    UnrepresentableValue { field: &'static str },

    #[error("field '{field}' cannot be empty")]
    EmptyField { field: &'static str },
    #[error("field '{field}' length {len} exceeds max {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("tick high must be >= low")]
    InvalidTickRange,
    #[error("tick batch cannot be empty")]
    EmptyBatch,
    #[error("tick batch of {len} exceeds max {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Failures surfaced by a [`crate::store::MarketStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("stock '{symbol}' not found")]
    NotFound { symbol: String },

    #[error("stock '{symbol}' already exists")]
    Conflict { symbol: String },

    #[error("request rejected: {reason}")]
    Rejected { reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("operation '{operation}' is not supported by this store")]
    Unsupported { operation: &'static str },
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Item-level failures that should not stop delivery of sibling items.
    pub const fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Rejected { .. } | Self::Validation(_)
        )
    }
}

impl From<tickforge_warehouse::WarehouseError> for StoreError {
    fn from(error: tickforge_warehouse::WarehouseError) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Failures of [`crate::ingestion::IngestionChannel::deliver`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("delivery interrupted after {delivered} ticks: {source}")]
    Interrupted {
        delivered: usize,
        #[source]
        source: StoreError,
    },
}

/// Errors that stop the simulation worker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("ingestion target not healthy after {attempts} attempts")]
    DependencyUnavailable { attempts: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
