//! Errors surfaced by the simulation harness.

use shardsim_core::ConfigError;
use shardsim_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Group task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}
