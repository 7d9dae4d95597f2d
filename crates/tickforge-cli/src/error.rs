use thiserror::Error;

use tickforge_core::{SettingsError, SimulationError, StoreError, ValidationError, WarehouseError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("{0}")]
    NotFound(String),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Settings(_) | Self::Command(_) => 2,
            Self::Store(StoreError::Validation(_) | StoreError::Unsupported { .. }) => 2,
            Self::Simulation(SimulationError::Validation(_)) => 2,
            Self::Store(_) | Self::Simulation(_) | Self::Warehouse(_) | Self::NotFound(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
