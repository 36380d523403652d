//! Common error types for Calm

use thiserror::Error;

/// Common result type for Calm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Calm crates
///
/// Toast lifecycle operations themselves never fail; these errors only
/// surface while bootstrapping a manager (configuration, runtime lookup).
#[derive(Error, Debug)]
pub enum Error {
    /// TOML parse error (wraps toml::de::Error)
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No async runtime available to drive expiry timers
    #[error("Runtime error: {0}")]
    Runtime(String),
}
