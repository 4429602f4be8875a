pub mod app_config;
pub mod config;
pub mod domain;
pub mod rewards;

pub use app_config::{AppConfig, Environment, SignatureAlgorithm, StorageCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use domain::{ActionKind, CategoryScore, MediaKind, Role};
pub use rewards::{funding_percentage, reward_for_rank};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid role '{0}': expected creator, investor, or fan")]
    InvalidRole(String),

    #[error("invalid action type '{0}': expected favorite, playlist, or review")]
    InvalidActionKind(String),

    #[error("invalid media type '{0}': expected audio or video")]
    InvalidMediaKind(String),
}
