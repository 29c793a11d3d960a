//! Shared error type for configuration and model parsing

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing credential, bad value, or unreadable TOML file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Value that does not name a known variant (insight type, CLI input)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
